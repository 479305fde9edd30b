//! Product search: accent-insensitive filtering, a debounced query and a
//! growing display window for long product lists.

use std::time::{Duration, Instant};

use crate::models::{MeatCut, Product, SupermarketProduct};

/// How close to the bottom (in pixels) a scroll must get to reveal more rows.
pub const SCROLL_PROXIMITY_PX: f64 = 200.0;

/// Lowercases and strips Portuguese diacritics (`Pão Açúcar` → `pao acucar`).
pub fn normalize_for_search(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

/// Fields a record exposes to the product search box.
pub trait Searchable {
    fn name(&self) -> &str;
    fn code(&self) -> Option<&str>;
    fn category(&self) -> Option<&str>;

    /// True when every term is contained in the name, code or category.
    fn matches_terms(&self, terms: &[String]) -> bool {
        let name = normalize_for_search(self.name());
        let code = self.code().map(normalize_for_search).unwrap_or_default();
        let category = self.category().map(normalize_for_search).unwrap_or_default();
        terms.iter().all(|term| {
            name.contains(term.as_str())
                || code.contains(term.as_str())
                || category.contains(term.as_str())
        })
    }
}

impl Searchable for Product {
    fn name(&self) -> &str {
        &self.name
    }
    fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }
    fn category(&self) -> Option<&str> {
        self.category_name.as_deref()
    }
}

impl Searchable for SupermarketProduct {
    fn name(&self) -> &str {
        &self.name
    }
    fn code(&self) -> Option<&str> {
        self.barcode.as_deref()
    }
    fn category(&self) -> Option<&str> {
        self.brand.as_deref()
    }
}

impl Searchable for MeatCut {
    fn name(&self) -> &str {
        &self.name
    }
    fn code(&self) -> Option<&str> {
        None
    }
    fn category(&self) -> Option<&str> {
        Some(self.animal.as_str())
    }
}

/// Splits a query into normalized, non-empty terms.
pub fn search_terms(query: &str) -> Vec<String> {
    normalize_for_search(query)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Returns the items matching every term of `query`, in their original order.
///
/// A blank query returns the full list.
pub fn filter_products<'a, T: Searchable>(items: &'a [T], query: &str) -> Vec<&'a T> {
    let terms = search_terms(query);
    if terms.is_empty() {
        return items.iter().collect();
    }
    items.iter().filter(|item| item.matches_terms(&terms)).collect()
}

/// Holds back a typed query until the user stops typing for `delay`.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<(String, Instant)>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Debouncer {
            delay,
            pending: None,
        }
    }

    /// Records a keystroke; restarts the delay.
    pub fn push(&mut self, query: impl Into<String>, now: Instant) {
        self.pending = Some((query.into(), now));
    }

    /// Fires the pending query once the delay has elapsed since the last push.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        match &self.pending {
            Some((_, at)) if now.saturating_duration_since(*at) >= self.delay => {
                self.pending.take().map(|(query, _)| query)
            }
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// A window of `display_count` rows over a filtered list.
#[derive(Debug, Clone)]
pub struct DisplayWindow {
    page_size: usize,
    display_count: usize,
}

impl DisplayWindow {
    pub fn new(page_size: usize) -> Self {
        let page_size = page_size.max(1);
        DisplayWindow {
            page_size,
            display_count: page_size,
        }
    }

    pub fn display_count(&self) -> usize {
        self.display_count
    }

    /// Back to a single page, e.g. after the query changed.
    pub fn reset(&mut self) {
        self.display_count = self.page_size;
    }

    pub fn has_more(&self, total: usize) -> bool {
        self.display_count < total
    }

    /// Grows the window by a page when the scroll is near the bottom.
    ///
    /// Returns true when more rows became visible.
    pub fn on_scroll(
        &mut self,
        scroll_top: f64,
        viewport_height: f64,
        content_height: f64,
        total: usize,
    ) -> bool {
        let remaining = content_height - (scroll_top + viewport_height);
        if remaining <= SCROLL_PROXIMITY_PX && self.has_more(total) {
            self.display_count = (self.display_count + self.page_size).min(total);
            true
        } else {
            false
        }
    }

    pub fn visible<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[..self.display_count.min(items.len())]
    }
}

/// A product list as the checkout screen shows it.
pub struct ProductBrowser<T> {
    items: Vec<T>,
    query: String,
    debouncer: Debouncer,
    window: DisplayWindow,
}

impl<T: Searchable> ProductBrowser<T> {
    pub fn new(items: Vec<T>, page_size: usize, debounce: Duration) -> Self {
        ProductBrowser {
            items,
            query: String::new(),
            debouncer: Debouncer::new(debounce),
            window: DisplayWindow::new(page_size),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Replaces the product list (e.g. after a refetch) keeping the query.
    pub fn set_items(&mut self, items: Vec<T>) {
        self.items = items;
        self.window.reset();
    }

    pub fn type_query(&mut self, query: impl Into<String>, now: Instant) {
        self.debouncer.push(query, now);
    }

    /// Applies a settled query. Returns true when the query changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.debouncer.poll(now) {
            Some(query) if query != self.query => {
                self.query = query;
                self.window.reset();
                true
            }
            _ => false,
        }
    }

    pub fn matching(&self) -> Vec<&T> {
        filter_products(&self.items, &self.query)
    }

    pub fn scroll(&mut self, scroll_top: f64, viewport_height: f64, content_height: f64) -> bool {
        let total = self.matching().len();
        self.window
            .on_scroll(scroll_top, viewport_height, content_height, total)
    }

    pub fn visible(&self) -> Vec<&T> {
        let matching = self.matching();
        self.window.visible(&matching).to_vec()
    }

    pub fn has_more(&self) -> bool {
        self.window.has_more(self.matching().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str, code: Option<&str>, category: Option<&str>) -> Product {
        Product {
            id: 0,
            code: code.map(str::to_string),
            name: name.to_string(),
            category_id: None,
            category_name: category.map(str::to_string),
            price: 100.0,
            cost_price: 80.0,
            stock: 10.0,
            min_stock: 2.0,
            created_at: String::new(),
        }
    }

    fn catalogue() -> Vec<Product> {
        vec![
            product("Pão de Açúcar", Some("P001"), Some("Padaria")),
            product("Açúcar Mascavado", Some("A010"), Some("Mercearia")),
            product("Leite Condensado", Some("L200"), Some("Mercearia")),
            product("Cerveja Cuca", Some("B300"), Some("Bebidas")),
            product("Água Pura", None, Some("Bebidas")),
        ]
    }

    #[test]
    fn test_normalize_strips_accents() {
        assert_eq!(normalize_for_search("Pão de AÇÚCAR"), "pao de acucar");
        assert_eq!(normalize_for_search("três"), "tres");
    }

    #[test]
    fn test_blank_query_returns_everything() {
        let items = catalogue();
        assert_eq!(filter_products(&items, "").len(), 5);
        assert_eq!(filter_products(&items, "   ").len(), 5);
    }

    #[test]
    fn test_accent_and_case_insensitive() {
        let items = catalogue();
        let found = filter_products(&items, "ACUCAR");
        let names: Vec<&str> = found.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Pão de Açúcar", "Açúcar Mascavado"]);
    }

    #[test]
    fn test_every_term_must_match_some_field() {
        let items = catalogue();
        let found = filter_products(&items, "açucar mercearia");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Açúcar Mascavado");

        let by_code = filter_products(&items, "b300");
        assert_eq!(by_code.len(), 1);
        assert_eq!(by_code[0].name, "Cerveja Cuca");

        assert!(filter_products(&items, "cerveja leite").is_empty());
    }

    #[test]
    fn test_debouncer_fires_after_quiet_period() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(300));

        debouncer.push("ce", start);
        debouncer.push("cer", start + Duration::from_millis(100));
        assert_eq!(debouncer.poll(start + Duration::from_millis(300)), None);
        assert_eq!(
            debouncer.poll(start + Duration::from_millis(400)),
            Some("cer".to_string())
        );
        assert!(!debouncer.is_pending());
        assert_eq!(debouncer.poll(start + Duration::from_millis(900)), None);
    }

    #[test]
    fn test_window_grows_near_bottom_only() {
        let mut window = DisplayWindow::new(2);
        assert_eq!(window.display_count(), 2);

        // Far from the bottom
        assert!(!window.on_scroll(0.0, 500.0, 2000.0, 5));
        assert_eq!(window.display_count(), 2);

        assert!(window.on_scroll(1400.0, 500.0, 2000.0, 5));
        assert_eq!(window.display_count(), 4);
        assert!(window.on_scroll(1500.0, 500.0, 2000.0, 5));
        assert_eq!(window.display_count(), 5);

        // Nothing more to reveal
        assert!(!window.on_scroll(1500.0, 500.0, 2000.0, 5));
        assert!(!window.has_more(5));

        window.reset();
        assert_eq!(window.display_count(), 2);
    }

    #[test]
    fn test_browser_resets_window_on_query_change() {
        let start = Instant::now();
        let mut browser = ProductBrowser::new(catalogue(), 2, Duration::from_millis(300));
        assert_eq!(browser.visible().len(), 2);
        assert!(browser.has_more());

        assert!(browser.scroll(900.0, 500.0, 1500.0));
        assert_eq!(browser.visible().len(), 4);

        browser.type_query("bebidas", start);
        assert!(!browser.tick(start + Duration::from_millis(10)));
        assert!(browser.tick(start + Duration::from_millis(300)));
        assert_eq!(browser.query(), "bebidas");

        let visible = browser.visible();
        assert_eq!(visible.len(), 2);
        let terms = search_terms(browser.query());
        assert!(visible.iter().all(|p| p.matches_terms(&terms)));
        assert!(!browser.has_more());

        browser.type_query("", start + Duration::from_millis(400));
        assert!(browser.tick(start + Duration::from_millis(800)));
        assert_eq!(browser.matching().len(), 5);
    }
}
