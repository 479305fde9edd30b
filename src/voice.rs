//! Turns a dictated sentence into a sale or expense.
//!
//! Speech recognition happens outside the crate; this module starts from
//! the transcript, e.g. "vendi 3 quilos de picanha por dois mil e quinhentos".

use serde::{Deserialize, Serialize};

use crate::models::{NewOfflineRecord, RecordKind};
use crate::ptnumber::{normalize_thousands_in_text, parse_pt_number_flexible, words_to_number};
use crate::search::normalize_for_search;

const SALE_WORDS: &[&str] = &["vendi", "venda", "vender", "vendemos", "vendeu", "vendido"];
const EXPENSE_WORDS: &[&str] = &[
    "gastei", "gasto", "gastos", "paguei", "pagamos", "pagar", "despesa", "comprei", "compramos",
];
const CURRENCY_WORDS: &[&str] = &["kz", "akz", "kwanza", "kwanzas"];
/// Words that introduce the amount ("por 2500", "a 500").
const PRICE_MARKERS: &[&str] = &["por", "a", "custou", "valor", "total"];
const UNIT_WORDS: &[&str] = &[
    "quilo", "quilos", "kg", "kilo", "kilos", "unidade", "unidades", "caixa", "caixas", "litro",
    "litros", "grade", "grades", "pacote", "pacotes",
];
const STOP_WORDS: &[&str] = &[
    "de", "do", "da", "dos", "das", "em", "no", "na", "com", "o", "os", "as", "eu", "nos", "hoje",
    "mais", "para", "pra", "um", "uma", "e",
];

const TRIM: &[char] = &['.', ',', ';', ':', '!', '?'];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceTransaction {
    pub kind: RecordKind,
    pub description: String,
    /// Total value of the transaction.
    pub amount: f64,
    pub quantity: f64,
    pub transcript: String,
}

impl VoiceTransaction {
    pub fn into_new_record(self) -> NewOfflineRecord {
        NewOfflineRecord {
            kind: self.kind,
            transcript: self.transcript,
            description: self.description,
            amount: self.amount,
            quantity: self.quantity,
        }
    }
}

struct Token<'a> {
    /// Original spelling without trailing punctuation.
    text: &'a str,
    /// Lowercase, accent-free form used for matching.
    folded: String,
}

/// A run of tokens read as one number.
struct NumberSpan {
    start: usize,
    end: usize,
    value: f64,
}

fn is_digits(token: &Token<'_>) -> bool {
    parse_pt_number_flexible(token.text).is_some()
}

fn is_number_word(token: &Token<'_>) -> bool {
    !is_digits(token) && token.folded != "e" && words_to_number(&token.folded).is_some()
}

/// Groups tokens into numbers: digit tokens stand alone, spelled words join
/// across "e" ("cento e vinte").
fn number_spans(tokens: &[Token<'_>]) -> Vec<NumberSpan> {
    let mut spans = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        if let Some(value) = parse_pt_number_flexible(tokens[i].text) {
            spans.push(NumberSpan {
                start: i,
                end: i + 1,
                value,
            });
            i += 1;
            continue;
        }
        if !is_number_word(&tokens[i]) {
            i += 1;
            continue;
        }

        let start = i;
        let mut end = i + 1;
        loop {
            match tokens.get(end) {
                Some(t) if is_number_word(t) => end += 1,
                Some(t) if t.folded == "e" && tokens.get(end + 1).map(is_number_word) == Some(true) => {
                    end += 2
                }
                _ => break,
            }
        }

        let phrase: Vec<&str> = tokens[start..end].iter().map(|t| t.folded.as_str()).collect();
        if let Some(value) = words_to_number(&phrase.join(" ")) {
            spans.push(NumberSpan { start, end, value });
        }
        i = end;
    }
    spans
}

fn detect_kind(tokens: &[Token<'_>]) -> Option<RecordKind> {
    tokens.iter().find_map(|t| {
        if SALE_WORDS.contains(&t.folded.as_str()) {
            Some(RecordKind::Sale)
        } else if EXPENSE_WORDS.contains(&t.folded.as_str()) {
            Some(RecordKind::Expense)
        } else {
            None
        }
    })
}

/// Index of the span holding the amount: one followed by a currency word,
/// else one introduced by a price marker, else the last number said.
fn amount_span(tokens: &[Token<'_>], spans: &[NumberSpan]) -> Option<usize> {
    let followed_by_currency = spans.iter().position(|s| {
        tokens
            .get(s.end)
            .map(|t| CURRENCY_WORDS.contains(&t.folded.as_str()))
            .unwrap_or(false)
    });
    let after_marker = || {
        spans.iter().rposition(|s| {
            s.start > 0 && PRICE_MARKERS.contains(&tokens[s.start - 1].folded.as_str())
        })
    };

    followed_by_currency
        .or_else(after_marker)
        .or_else(|| spans.len().checked_sub(1))
}

/// Parses a transcript into a transaction, or `None` when it names no
/// sale/expense or no amount.
pub fn parse_transaction(transcript: &str) -> Option<VoiceTransaction> {
    let normalized = normalize_thousands_in_text(transcript);
    let tokens: Vec<Token<'_>> = normalized
        .split_whitespace()
        .map(|raw| {
            let text = raw.trim_end_matches(TRIM);
            Token {
                text,
                folded: normalize_for_search(text),
            }
        })
        .filter(|t| !t.text.is_empty())
        .collect();

    let kind = detect_kind(&tokens)?;
    let spans = number_spans(&tokens);
    let amount_index = amount_span(&tokens, &spans)?;
    let amount = spans[amount_index].value;
    if amount <= 0.0 {
        return None;
    }

    let quantity = spans[..amount_index]
        .first()
        .map(|s| s.value)
        .filter(|q| *q > 0.0)
        .unwrap_or(1.0);

    let in_span = |i: usize| spans.iter().any(|s| i >= s.start && i < s.end);
    let description_words: Vec<&str> = tokens
        .iter()
        .enumerate()
        .filter(|(i, t)| {
            let f = t.folded.as_str();
            !in_span(*i)
                && !SALE_WORDS.contains(&f)
                && !EXPENSE_WORDS.contains(&f)
                && !CURRENCY_WORDS.contains(&f)
                && !PRICE_MARKERS.contains(&f)
                && !UNIT_WORDS.contains(&f)
                && !STOP_WORDS.contains(&f)
        })
        .map(|(_, t)| t.text)
        .collect();

    let description = if description_words.is_empty() {
        match kind {
            RecordKind::Sale => "Venda por voz".to_string(),
            RecordKind::Expense => "Despesa por voz".to_string(),
        }
    } else {
        description_words.join(" ").to_lowercase()
    };

    Some(VoiceTransaction {
        kind,
        description,
        amount,
        quantity,
        transcript: transcript.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sale_with_spelled_amount() {
        let tx = parse_transaction("Vendi 3 quilos de picanha por dois mil e quinhentos").unwrap();
        assert_eq!(tx.kind, RecordKind::Sale);
        assert_eq!(tx.amount, 2500.0);
        assert_eq!(tx.quantity, 3.0);
        assert_eq!(tx.description, "picanha");
    }

    #[test]
    fn test_expense_with_currency_word() {
        let tx = parse_transaction("Paguei 1.500 kz de luz.").unwrap();
        assert_eq!(tx.kind, RecordKind::Expense);
        assert_eq!(tx.amount, 1500.0);
        assert_eq!(tx.quantity, 1.0);
        assert_eq!(tx.description, "luz");
    }

    #[test]
    fn test_spelled_quantity_and_price_marker() {
        let tx = parse_transaction("vendi duas cervejas a 500").unwrap();
        assert_eq!(tx.quantity, 2.0);
        assert_eq!(tx.amount, 500.0);
        assert_eq!(tx.description, "cervejas");
    }

    #[test]
    fn test_small_spelled_amount() {
        let tx = parse_transaction("vendi pão por cento e vinte kwanzas").unwrap();
        assert_eq!(tx.amount, 120.0);
        assert_eq!(tx.description, "pão");
    }

    #[test]
    fn test_last_number_is_the_amount() {
        let tx = parse_transaction("gastei cinco mil em gasolina").unwrap();
        assert_eq!(tx.kind, RecordKind::Expense);
        assert_eq!(tx.amount, 5000.0);
        assert_eq!(tx.description, "gasolina");
    }

    #[test]
    fn test_default_description() {
        let tx = parse_transaction("venda de 3000").unwrap();
        assert_eq!(tx.description, "Venda por voz");
        assert_eq!(tx.amount, 3000.0);
    }

    #[test]
    fn test_unrecognized_transcripts() {
        assert!(parse_transaction("bom dia").is_none());
        assert!(parse_transaction("vendi picanha").is_none());
        assert!(parse_transaction("3000 de picanha").is_none());
        assert!(parse_transaction("").is_none());
    }

    #[test]
    fn test_into_new_record_keeps_transcript() {
        let record = parse_transaction("comprei gás por 7.500")
            .unwrap()
            .into_new_record();
        assert_eq!(record.kind, RecordKind::Expense);
        assert_eq!(record.amount, 7500.0);
        assert_eq!(record.description, "gás");
        assert_eq!(record.transcript, "comprei gás por 7.500");
    }
}
