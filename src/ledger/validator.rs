use crate::error::ValidationError;
use serde_json::Value;
use thiserror::Error;

pub const REQUIRED_SALE_FIELDS: [&str; 4] = ["sellerId", "buyerName", "quantityKg", "price"];

/// Why a raw sale request was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaleInputError {
    #[error("Missing required fields")]
    MissingFields,
    #[error("{}", .0.reason)]
    Invalid(#[from] ValidationError),
}

/// A sale request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidSale {
    pub seller_id: String,
    pub buyer_name: String,
    pub quantity_kg: u64,
    pub price: u64,
}

pub struct SaleValidator {
    max_quantity_kg: u64,
    max_price: u64,
    max_name_len: usize,
}

impl Default for SaleValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl SaleValidator {
    pub fn new() -> Self {
        SaleValidator {
            max_quantity_kg: 1_000_000_000,
            max_price: 1_000_000_000,
            max_name_len: 128,
        }
    }

    pub fn with_max_quantity(mut self, max: u64) -> Self {
        self.max_quantity_kg = max;
        self
    }

    pub fn with_max_price(mut self, max: u64) -> Self {
        self.max_price = max;
        self
    }

    pub fn validate_seller_id(&self, seller_id: &str) -> Result<(), ValidationError> {
        if seller_id.is_empty() {
            return Err(ValidationError::new("sellerId", "sellerId cannot be empty"));
        }
        if seller_id.len() > self.max_name_len {
            return Err(ValidationError::new(
                "sellerId",
                format!("sellerId exceeds maximum length of {}", self.max_name_len),
            ));
        }
        Ok(())
    }

    pub fn validate_buyer_name(&self, buyer_name: &str) -> Result<(), ValidationError> {
        if buyer_name.trim().is_empty() {
            return Err(ValidationError::new("buyerName", "buyerName cannot be empty"));
        }
        if buyer_name.chars().count() > self.max_name_len {
            return Err(ValidationError::new(
                "buyerName",
                format!("buyerName exceeds maximum length of {}", self.max_name_len),
            ));
        }
        Ok(())
    }

    pub fn validate_quantity(&self, quantity_kg: u64) -> Result<(), ValidationError> {
        Self::validate_amount("quantityKg", quantity_kg, self.max_quantity_kg)
    }

    pub fn validate_price(&self, price: u64) -> Result<(), ValidationError> {
        Self::validate_amount("price", price, self.max_price)
    }

    fn validate_amount(field: &str, value: u64, max: u64) -> Result<(), ValidationError> {
        if value == 0 {
            return Err(ValidationError::new(
                field,
                format!("{} must be a positive number", field),
            ));
        }
        if value > max {
            return Err(ValidationError::new(
                field,
                format!("{} {} exceeds maximum {}", field, value, max),
            ));
        }
        Ok(())
    }

    /// Checks already-typed sale fields.
    pub fn validate_sale(
        &self,
        seller_id: &str,
        buyer_name: &str,
        quantity_kg: u64,
        price: u64,
    ) -> Result<(), ValidationError> {
        self.validate_seller_id(seller_id)?;
        self.validate_buyer_name(buyer_name)?;
        self.validate_quantity(quantity_kg)?;
        self.validate_price(price)?;
        Ok(())
    }

    /// Validates a sale as it arrives over HTTP.
    ///
    /// Absent, null, empty and zero values all count as missing. Numbers may
    /// be sent as JSON numbers or numeric strings and must be positive whole
    /// numbers.
    pub fn validate_request(
        &self,
        seller_id: Option<&str>,
        buyer_name: Option<&str>,
        quantity_kg: Option<&Value>,
        price: Option<&Value>,
    ) -> Result<ValidSale, SaleInputError> {
        let seller_id = seller_id.filter(|s| !s.is_empty());
        let buyer_name = buyer_name.filter(|s| !s.is_empty());
        let quantity = quantity_kg.filter(|v| !is_falsy(v));
        let price = price.filter(|v| !is_falsy(v));

        let (Some(seller_id), Some(buyer_name), Some(quantity), Some(price)) =
            (seller_id, buyer_name, quantity, price)
        else {
            return Err(SaleInputError::MissingFields);
        };

        let quantity_kg = parse_amount("quantityKg", quantity)?;
        let price = parse_amount("price", price)?;
        self.validate_sale(seller_id, buyer_name, quantity_kg, price)?;

        Ok(ValidSale {
            seller_id: seller_id.to_string(),
            buyer_name: buyer_name.to_string(),
            quantity_kg,
            price,
        })
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f == 0.0),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn parse_amount(field: &str, value: &Value) -> Result<u64, ValidationError> {
    let not_positive =
        || ValidationError::new(field, format!("{} must be a positive number", field));

    let number = match value {
        Value::Number(n) => {
            if let Some(v) = n.as_u64() {
                return Ok(v);
            }
            n.as_f64().ok_or_else(not_positive)?
        }
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| not_positive())?,
        _ => return Err(not_positive()),
    };

    if !number.is_finite() || number <= 0.0 {
        return Err(not_positive());
    }
    if number.fract() != 0.0 {
        return Err(ValidationError::new(
            field,
            format!("{} must be a whole number", field),
        ));
    }
    if number > u64::MAX as f64 {
        return Err(ValidationError::new(
            field,
            format!("{} is too large", field),
        ));
    }
    Ok(number as u64)
}
