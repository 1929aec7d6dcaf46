//! API models for request and response payloads

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Product as stored and returned
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub stock: i64,
}

/// Request for product creation
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub stock: i64,
}

impl NewProduct {
    pub fn validate(&self) -> Result<(), String> {
        validate_name(&self.name)?;
        validate_price(self.price)?;
        validate_stock(self.stock)
    }
}

/// Request for a partial product update; absent fields keep their value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i64>,
}

impl UpdateProduct {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        if let Some(stock) = self.stock {
            validate_stock(stock)?;
        }
        Ok(())
    }

    /// Apply the provided fields on top of `product`
    pub fn apply(&self, mut product: Product) -> Product {
        if let Some(name) = &self.name {
            product.name = name.clone();
        }
        if let Some(description) = &self.description {
            product.description = description.clone();
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
        product
    }
}

fn validate_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Product name is required".to_string());
    }
    Ok(())
}

fn validate_price(price: f64) -> Result<(), String> {
    if !price.is_finite() || price < 0.0 {
        return Err("Price must be a non-negative number".to_string());
    }
    Ok(())
}

fn validate_stock(stock: i64) -> Result<(), String> {
    if stock < 0 {
        return Err("Stock must not be negative".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product() -> Product {
        Product {
            id: 1,
            name: "Product A".into(),
            description: "First".into(),
            price: 1000.0,
            stock: 10,
        }
    }

    #[test]
    fn test_new_product_validation() {
        let mut input = NewProduct {
            name: "Widget".into(),
            description: String::new(),
            price: 0.0,
            stock: 0,
        };
        assert!(input.validate().is_ok());

        input.name = "  ".into();
        assert_eq!(input.validate().unwrap_err(), "Product name is required");

        input.name = "Widget".into();
        input.price = -1.0;
        assert!(input.validate().is_err());

        input.price = 1.0;
        input.stock = -5;
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_partial_update_keeps_missing_fields() {
        let update = UpdateProduct {
            price: Some(1500.0),
            ..Default::default()
        };
        assert!(update.validate().is_ok());

        let updated = update.apply(product());
        assert_eq!(updated.price, 1500.0);
        assert_eq!(updated.name, "Product A");
        assert_eq!(updated.stock, 10);
    }

    #[test]
    fn test_partial_update_validates_provided_fields() {
        let update = UpdateProduct {
            name: Some(String::new()),
            ..Default::default()
        };
        assert!(update.validate().is_err());

        let update = UpdateProduct {
            stock: Some(-1),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }
}
