//! Checkout cart held by the POS screen before a sale is recorded.

use crate::commands::round_money;
use crate::error::{AppError, AppResult};
use crate::models::{MeatCut, NewSale, NewSaleItem, PaymentMethod, Product};
use crate::validation;

#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub product_id: Option<i64>,
    pub meat_cut_id: Option<i64>,
    pub description: String,
    pub unit_price: f64,
    pub quantity: f64,
    /// Stock on hand when the line was added; `None` when not tracked.
    pub available: Option<f64>,
}

impl CartLine {
    pub fn subtotal(&self) -> f64 {
        round_money(self.unit_price * self.quantity)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Cart {
    lines: Vec<CartLine>,
    discount: f64,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Adds a catalogue product, merging with an existing line.
    pub fn add_product(&mut self, product: &Product, quantity: f64) -> AppResult<()> {
        validation::positive("Quantity", quantity)?;

        let in_cart = self
            .line_for(product.id)
            .map(|line| line.quantity)
            .unwrap_or(0.0);
        if in_cart + quantity > product.stock + 1e-9 {
            return Err(AppError::InsufficientStock {
                product: product.name.clone(),
                requested: in_cart + quantity,
                available: product.stock,
            });
        }

        match self
            .lines
            .iter_mut()
            .find(|line| line.product_id == Some(product.id))
        {
            Some(line) => line.quantity += quantity,
            None => self.lines.push(CartLine {
                product_id: Some(product.id),
                meat_cut_id: None,
                description: product.name.clone(),
                unit_price: product.price,
                quantity,
                available: Some(product.stock),
            }),
        }
        Ok(())
    }

    /// Adds a weighed meat cut priced per kilo; the line quantity is in kg.
    pub fn add_meat_cut(&mut self, cut: &MeatCut, weight_kg: f64) -> AppResult<()> {
        validation::positive("Weight", weight_kg)?;

        let in_cart = self
            .lines
            .iter()
            .find(|line| line.meat_cut_id == Some(cut.id))
            .map(|line| line.quantity)
            .unwrap_or(0.0);
        if in_cart + weight_kg > cut.stock_kg + 1e-9 {
            return Err(AppError::InsufficientStock {
                product: cut.name.clone(),
                requested: in_cart + weight_kg,
                available: cut.stock_kg,
            });
        }

        match self
            .lines
            .iter_mut()
            .find(|line| line.meat_cut_id == Some(cut.id))
        {
            Some(line) => line.quantity += weight_kg,
            None => self.lines.push(CartLine {
                product_id: None,
                meat_cut_id: Some(cut.id),
                description: format!("{} (kg)", cut.name),
                unit_price: cut.price_per_kg,
                quantity: weight_kg,
                available: Some(cut.stock_kg),
            }),
        }
        Ok(())
    }

    /// Adds a line that is not in the catalogue.
    pub fn add_custom(&mut self, description: &str, unit_price: f64, quantity: f64) -> AppResult<()> {
        validation::min_len("Description", description, 1)?;
        validation::non_negative("Unit price", unit_price)?;
        validation::positive("Quantity", quantity)?;
        self.lines.push(CartLine {
            product_id: None,
            meat_cut_id: None,
            description: description.trim().to_string(),
            unit_price,
            quantity,
            available: None,
        });
        Ok(())
    }

    fn line_for(&self, product_id: i64) -> Option<&CartLine> {
        self.lines
            .iter()
            .find(|line| line.product_id == Some(product_id))
    }

    /// Sets the quantity of line `index`; zero removes it.
    pub fn set_quantity(&mut self, index: usize, quantity: f64) -> AppResult<()> {
        validation::non_negative("Quantity", quantity)?;
        let line = self
            .lines
            .get_mut(index)
            .ok_or_else(|| AppError::not_found("Cart line", index))?;

        if let Some(available) = line.available {
            if quantity > available + 1e-9 {
                return Err(AppError::InsufficientStock {
                    product: line.description.clone(),
                    requested: quantity,
                    available,
                });
            }
        }

        if quantity == 0.0 {
            self.lines.remove(index);
        } else {
            line.quantity = quantity;
        }
        self.clamp_discount();
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> AppResult<CartLine> {
        if index >= self.lines.len() {
            return Err(AppError::not_found("Cart line", index));
        }
        let line = self.lines.remove(index);
        self.clamp_discount();
        Ok(line)
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.discount = 0.0;
    }

    pub fn subtotal(&self) -> f64 {
        round_money(self.lines.iter().map(CartLine::subtotal).sum())
    }

    /// Absolute discount, clamped to the subtotal.
    pub fn apply_discount(&mut self, discount: f64) -> AppResult<()> {
        validation::non_negative("Discount", discount)?;
        self.discount = discount;
        self.clamp_discount();
        Ok(())
    }

    fn clamp_discount(&mut self) {
        self.discount = self.discount.min(self.subtotal());
    }

    pub fn discount(&self) -> f64 {
        self.discount
    }

    pub fn total(&self) -> f64 {
        round_money(self.subtotal() - self.discount)
    }

    /// Change due for a cash payment.
    pub fn change_for(&self, amount_received: f64) -> AppResult<f64> {
        let total = self.total();
        if amount_received + 1e-9 < total {
            return Err(AppError::validation(format!(
                "Amount received ({:.2}) is less than the total ({:.2})",
                amount_received, total
            )));
        }
        Ok(round_money(amount_received - total))
    }

    pub fn to_new_sale(
        &self,
        payment_method: PaymentMethod,
        amount_received: Option<f64>,
        customer_name: Option<String>,
        customer_nif: Option<String>,
    ) -> AppResult<NewSale> {
        if self.is_empty() {
            return Err(AppError::validation("The cart is empty"));
        }
        if let Some(received) = amount_received {
            self.change_for(received)?;
        }

        Ok(NewSale {
            items: self
                .lines
                .iter()
                .map(|line| NewSaleItem {
                    product_id: line.product_id,
                    meat_cut_id: line.meat_cut_id,
                    description: line.description.clone(),
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                })
                .collect(),
            discount: self.discount,
            payment_method,
            amount_received,
            customer_name,
            customer_nif,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: i64, name: &str, price: f64, stock: f64) -> Product {
        Product {
            id,
            code: None,
            name: name.to_string(),
            category_id: None,
            category_name: None,
            price,
            cost_price: 0.0,
            stock,
            min_stock: 0.0,
            created_at: String::new(),
        }
    }

    #[test]
    fn test_add_merges_lines_and_totals() {
        let mut cart = Cart::new();
        let arroz = product(1, "Arroz 1kg", 850.0, 10.0);
        let oleo = product(2, "Óleo 1L", 1200.0, 5.0);

        cart.add_product(&arroz, 2.0).unwrap();
        cart.add_product(&oleo, 1.0).unwrap();
        cart.add_product(&arroz, 1.0).unwrap();

        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.lines()[0].quantity, 3.0);
        assert_eq!(cart.subtotal(), 3750.0);
        assert_eq!(cart.total(), 3750.0);
    }

    #[test]
    fn test_stock_is_enforced_across_additions() {
        let mut cart = Cart::new();
        let sumo = product(1, "Sumo", 300.0, 3.0);
        cart.add_product(&sumo, 2.0).unwrap();

        let result = cart.add_product(&sumo, 2.0);
        assert!(matches!(result, Err(AppError::InsufficientStock { .. })));
        assert!(cart.set_quantity(0, 4.0).is_err());
        assert_eq!(cart.lines()[0].quantity, 2.0);
    }

    #[test]
    fn test_discount_is_clamped_and_change_computed() {
        let mut cart = Cart::new();
        cart.add_custom("Saco", 50.0, 2.0).unwrap();
        cart.apply_discount(500.0).unwrap();
        assert_eq!(cart.discount(), 100.0);
        assert_eq!(cart.total(), 0.0);

        cart.add_custom("Pão", 100.0, 5.0).unwrap();
        cart.apply_discount(100.0).unwrap();
        assert_eq!(cart.total(), 500.0);
        assert_eq!(cart.change_for(1000.0).unwrap(), 500.0);
        assert!(cart.change_for(499.0).is_err());

        // Removing lines pulls the discount down with the subtotal
        cart.remove(1).unwrap();
        assert_eq!(cart.discount(), 100.0);
        assert_eq!(cart.total(), 0.0);
    }

    #[test]
    fn test_meat_cut_by_weight() {
        let mut cart = Cart::new();
        let picanha = MeatCut {
            id: 1,
            name: "Picanha".to_string(),
            animal: "bovino".to_string(),
            price_per_kg: 9000.0,
            stock_kg: 4.0,
            created_at: String::new(),
        };
        cart.add_meat_cut(&picanha, 1.5).unwrap();
        assert_eq!(cart.total(), 13500.0);
        assert!(cart.add_meat_cut(&picanha, 5.0).is_err());

        // Same cut merges; the weight already in the cart counts
        cart.add_meat_cut(&picanha, 2.0).unwrap();
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 3.5);
        assert!(cart.add_meat_cut(&picanha, 1.0).is_err());

        let sale = cart.to_new_sale(PaymentMethod::Cash, None, None, None).unwrap();
        assert_eq!(sale.items[0].meat_cut_id, Some(1));
        assert_eq!(sale.items[0].product_id, None);
    }

    #[test]
    fn test_set_quantity_zero_removes_and_to_new_sale() {
        let mut cart = Cart::new();
        assert!(cart
            .to_new_sale(PaymentMethod::Cash, None, None, None)
            .is_err());

        let agua = product(7, "Água", 150.0, 20.0);
        cart.add_product(&agua, 4.0).unwrap();
        cart.add_custom("Gelo", 200.0, 1.0).unwrap();
        cart.set_quantity(1, 0.0).unwrap();
        assert_eq!(cart.lines().len(), 1);

        let sale = cart
            .to_new_sale(PaymentMethod::Multicaixa, Some(600.0), Some("Ana".into()), None)
            .unwrap();
        assert_eq!(sale.items.len(), 1);
        assert_eq!(sale.items[0].product_id, Some(7));
        assert_eq!(sale.payment_method, PaymentMethod::Multicaixa);
        assert!(cart
            .to_new_sale(PaymentMethod::Cash, Some(100.0), None, None)
            .is_err());

        cart.clear();
        assert!(cart.is_empty());
    }
}
