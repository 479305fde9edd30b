//! Portuguese number handling for typed and dictated amounts.
//!
//! Angolan users write `1.500`, `23,500` or `1.234,50` and say
//! "dois mil e quinhentos". Everything here turns those into plain numbers.

use crate::search::normalize_for_search;

/// Values at or above this drop their fractional part.
const INTEGER_THRESHOLD: f64 = 1000.0;

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?'];

/// Parses a single numeric token written with PT thousands/decimal separators.
///
/// Returns `None` for anything that is not a number (including the word
/// `mil`); callers keep the original text in that case.
pub fn parse_pt_number_flexible(token: &str) -> Option<f64> {
    let value = parse_separated(token)?;
    Some(if value.abs() >= INTEGER_THRESHOLD {
        value.trunc()
    } else {
        value
    })
}

/// Parses a typed money amount with the same separator rules, keeping the
/// cêntimos (`2.500,50` is 2500.5).
pub fn parse_pt_money(token: &str) -> Option<f64> {
    parse_separated(token).map(|value| (value * 100.0).round() / 100.0)
}

fn parse_separated(token: &str) -> Option<f64> {
    let lowered = token.trim().to_lowercase();
    let mut s = lowered.as_str();
    for suffix in ["akz", "kz"] {
        if let Some(stripped) = s.strip_suffix(suffix) {
            s = stripped.trim_end();
            break;
        }
    }

    let (negative, s) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };

    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',') {
        return None;
    }
    if !s.starts_with(|c: char| c.is_ascii_digit()) || !s.ends_with(|c: char| c.is_ascii_digit())
    {
        return None;
    }

    let dots = s.matches('.').count();
    let commas = s.matches(',').count();

    let value = match (dots, commas) {
        (0, 0) => s.parse::<f64>().ok()?,
        (d, c) if d > 0 && c > 0 => {
            let last_dot = s.rfind('.')?;
            let last_comma = s.rfind(',')?;
            let (decimal_sep, thousands_sep, decimal_pos) = if last_dot > last_comma {
                ('.', ',', last_dot)
            } else {
                (',', '.', last_comma)
            };
            if s.matches(decimal_sep).count() != 1 {
                return None;
            }
            let int_digits = join_groups(&s[..decimal_pos], thousands_sep)?;
            let frac_digits = &s[decimal_pos + 1..];
            format!("{}.{}", int_digits, frac_digits).parse::<f64>().ok()?
        }
        (d, 0) if d > 1 => join_groups(s, '.')?.parse::<f64>().ok()?,
        (0, c) if c > 1 => join_groups(s, ',')?.parse::<f64>().ok()?,
        _ => {
            let sep = if dots == 1 { '.' } else { ',' };
            let (int_part, frac_part) = s.split_once(sep)?;
            let looks_grouped = frac_part.len() == 3
                && int_part.len() <= 3
                && !int_part.trim_start_matches('0').is_empty();
            if looks_grouped {
                format!("{}{}", int_part, frac_part).parse::<f64>().ok()?
            } else {
                format!("{}.{}", int_part, frac_part).parse::<f64>().ok()?
            }
        }
    };

    Some(if negative { -value } else { value })
}

/// Joins thousands groups, checking the 1-3 / 3 / 3 digit layout.
fn join_groups(s: &str, sep: char) -> Option<String> {
    let mut groups = s.split(sep);
    let first = groups.next()?;
    if first.is_empty() || first.len() > 3 {
        return None;
    }
    let mut digits = first.to_string();
    for group in groups {
        if group.len() != 3 {
            return None;
        }
        digits.push_str(group);
    }
    Some(digits)
}

/// Value of a spelled-out number word below one thousand.
fn small_number(word: &str) -> Option<f64> {
    let value = match word {
        "zero" => 0.0,
        "um" | "uma" => 1.0,
        "dois" | "duas" => 2.0,
        "tres" => 3.0,
        "quatro" => 4.0,
        "cinco" => 5.0,
        "seis" => 6.0,
        "sete" => 7.0,
        "oito" => 8.0,
        "nove" => 9.0,
        "dez" => 10.0,
        "onze" => 11.0,
        "doze" => 12.0,
        "treze" => 13.0,
        "catorze" | "quatorze" => 14.0,
        "quinze" => 15.0,
        "dezasseis" | "dezesseis" | "dezaseis" => 16.0,
        "dezassete" | "dezessete" | "dezasete" => 17.0,
        "dezoito" => 18.0,
        "dezanove" | "dezenove" => 19.0,
        "vinte" => 20.0,
        "trinta" => 30.0,
        "quarenta" => 40.0,
        "cinquenta" | "cincoenta" => 50.0,
        "sessenta" => 60.0,
        "setenta" => 70.0,
        "oitenta" => 80.0,
        "noventa" => 90.0,
        "cem" | "cento" => 100.0,
        "duzentos" | "duzentas" => 200.0,
        "trezentos" | "trezentas" => 300.0,
        "quatrocentos" | "quatrocentas" => 400.0,
        "quinhentos" | "quinhentas" => 500.0,
        "seiscentos" | "seiscentas" => 600.0,
        "setecentos" | "setecentas" => 700.0,
        "oitocentos" | "oitocentas" => 800.0,
        "novecentos" | "novecentas" => 900.0,
        _ => return None,
    };
    Some(value)
}

fn multiplier(word: &str) -> Option<f64> {
    match word {
        "mil" => Some(1_000.0),
        "milhao" | "milhoes" => Some(1_000_000.0),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Piece {
    /// Spelled number word below one thousand.
    Word(f64),
    /// Token written with digits.
    Digits(f64),
    Multiplier(f64),
    And,
    Other,
}

fn classify(core: &str) -> Piece {
    let folded = normalize_for_search(core);
    if folded == "e" {
        return Piece::And;
    }
    if let Some(m) = multiplier(&folded) {
        return Piece::Multiplier(m);
    }
    if let Some(v) = small_number(&folded) {
        return Piece::Word(v);
    }
    if let Some(v) = parse_pt_number_flexible(core) {
        return Piece::Digits(v);
    }
    Piece::Other
}

impl Piece {
    fn is_number(self) -> bool {
        matches!(self, Piece::Word(_) | Piece::Digits(_) | Piece::Multiplier(_))
    }
}

/// Combines the pieces of one spoken number ("dois mil e quinhentos").
fn evaluate(pieces: &[Piece]) -> f64 {
    let mut total = 0.0;
    let mut current = 0.0;
    for piece in pieces {
        match *piece {
            Piece::Word(v) | Piece::Digits(v) => current += v,
            Piece::Multiplier(m) => {
                let base = if current == 0.0 { 1.0 } else { current };
                total += base * m;
                current = 0.0;
            }
            Piece::And | Piece::Other => {}
        }
    }
    total + current
}

fn split_trailing_punctuation(token: &str) -> (&str, &str) {
    let core = token.trim_end_matches(TRAILING_PUNCTUATION);
    (core, &token[core.len()..])
}

fn format_integer(value: f64) -> String {
    format!("{}", value.round() as i64)
}

/// Rewrites spoken or separator-laden thousands in an utterance as digits.
///
/// `"vendi por dois mil e quinhentos"` becomes `"vendi por 2500"` and
/// `"custou 1.500 kwanzas"` becomes `"custou 1500 kwanzas"`. Small numbers
/// without a multiplier and tokens that don't parse are left as they were.
pub fn normalize_thousands_in_text(text: &str) -> String {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let parts: Vec<(&str, &str, Piece)> = tokens
        .iter()
        .map(|token| {
            let (core, punct) = split_trailing_punctuation(token);
            (core, punct, classify(core))
        })
        .collect();

    let mut out: Vec<String> = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < parts.len() {
        let (core, punct, piece) = parts[i];
        if !piece.is_number() {
            out.push(format!("{}{}", core, punct));
            i += 1;
            continue;
        }

        // Collect the longest run that reads as a single number.
        let start = i;
        let mut end = i + 1;
        let mut previous = piece;
        let mut closed = !punct.is_empty();
        while end < parts.len() && !closed {
            let (_, next_punct, next) = parts[end];
            let joins = match next {
                Piece::Word(_) | Piece::Multiplier(_) => true,
                Piece::Digits(_) => matches!(previous, Piece::Multiplier(_) | Piece::And),
                Piece::And => parts
                    .get(end + 1)
                    .map(|(_, _, after)| after.is_number())
                    .unwrap_or(false),
                Piece::Other => false,
            };
            if !joins {
                break;
            }
            previous = next;
            closed = !next_punct.is_empty();
            end += 1;
        }

        let run = &parts[start..end];
        let has_multiplier = run
            .iter()
            .any(|(_, _, p)| matches!(p, Piece::Multiplier(_)));

        if has_multiplier {
            let pieces: Vec<Piece> = run.iter().map(|(_, _, p)| *p).collect();
            let (_, last_punct, _) = run[run.len() - 1];
            out.push(format!("{}{}", format_integer(evaluate(&pieces)), last_punct));
        } else {
            for (core, punct, p) in run {
                match p {
                    Piece::Digits(v) if *v >= INTEGER_THRESHOLD => {
                        out.push(format!("{}{}", format_integer(*v), punct))
                    }
                    _ => out.push(format!("{}{}", core, punct)),
                }
            }
        }
        i = end;
    }

    out.join(" ")
}

/// Evaluates a phrase made only of number words and digits.
///
/// `"vinte e cinco"` → 25, `"dois mil e quinhentos"` → 2500, `"3"` → 3.
/// Any word that is not part of a number makes the whole phrase `None`.
pub fn words_to_number(words: &str) -> Option<f64> {
    let pieces: Vec<Piece> = words.split_whitespace().map(classify).collect();
    if pieces.is_empty() || !pieces.iter().any(|p| p.is_number()) {
        return None;
    }
    if pieces.iter().any(|p| *p == Piece::Other) {
        return None;
    }
    Some(evaluate(&pieces))
}
