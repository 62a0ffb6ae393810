use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::security::Role;

/// Implements the string mapping used for the text columns that back an enum.
macro_rules! text_enum {
    ($ty:ident { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $name,)+
                }
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok($ty::$variant),)+
                    other => Err(format!("invalid {} '{}'", stringify!($ty), other)),
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

text_enum!(Gender {
    Male => "male",
    Female => "female",
    Other => "other",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Boleto,
    Pix,
    DebitCard,
    CreditCard,
}

text_enum!(PaymentMethod {
    Boleto => "boleto",
    Pix => "pix",
    DebitCard => "debit_card",
    CreditCard => "credit_card",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

text_enum!(PaymentStatus {
    Pending => "pending",
    Paid => "paid",
    Overdue => "overdue",
    Cancelled => "cancelled",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductKind {
    Physical,
    Service,
}

text_enum!(ProductKind {
    Physical => "physical",
    Service => "service",
});

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Guardian {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub father_name: Option<String>,
    pub father_phone: Option<String>,
    pub father_email: Option<String>,
    pub father_tax_id: Option<String>,
    pub mother_name: Option<String>,
    pub mother_phone: Option<String>,
    pub mother_email: Option<String>,
    pub mother_tax_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub birth_date: NaiveDate,
    pub gender: Gender,
    pub email: String,
    pub phone: String,
    pub tax_id: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub birthday_flag: bool,
    pub delinquent_flag: bool,
    pub guardian_id: Option<Uuid>,
    pub guardian: Option<Guardian>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CustomerBasic {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// Kind specific product data. The `kind` tag is fixed once the product exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProductDetails {
    Physical {
        sku: String,
        stock: i32,
        size: Option<String>,
        color: Option<String>,
        weight: Option<f64>,
    },
    Service {
        duration_months: i32,
        recurring: bool,
        benefits: Option<String>,
    },
}

impl ProductDetails {
    pub fn kind(&self) -> ProductKind {
        match self {
            ProductDetails::Physical { .. } => ProductKind::Physical,
            ProductDetails::Service { .. } => ProductKind::Service,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub status: bool,
    pub details: ProductDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Sale {
    pub id: Uuid,
    pub product_id: Uuid,
    pub customer_id: Uuid,
    pub price: f64,
    pub cost: f64,
    pub profit: f64,
    pub paid: bool,
    pub quantity: i32,
    pub payment_method: PaymentMethod,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Subscription {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub payment_method: PaymentMethod,
    pub billing_day: i32,
    pub payment_status: PaymentStatus,
    pub next_billing_date: DateTime<Utc>,
    pub amount: f64,
    pub active: bool,
    /// Last four digits of the stored card, when one is on file.
    pub card_last_four: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
