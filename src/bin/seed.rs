use chrono::{NaiveDate, Utc};
use gym_members_api::{
    config::AppConfig,
    db::{OrmConn, create_orm_conn, sync_schema},
    entity::{
        Customers, Products, Users, customers, physical_products, products, service_products,
        users,
    },
    models::{Gender, ProductKind},
    security::{PasswordHasher, Role},
    services::auth_service::bootstrap_superadmin,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    sync_schema(&orm).await?;

    let passwords = PasswordHasher::new(&config.password_hash)?;
    bootstrap_superadmin(&orm, &passwords, &config.superadmin).await?;
    let admin_id = ensure_user(&orm, &passwords, "admin@example.com", "admin123", Role::Admin).await?;
    seed_products(&orm).await?;
    let customer_id = seed_customer(&orm).await?;

    println!("Seed completed. Admin ID: {admin_id}, Customer ID: {customer_id}");
    Ok(())
}

async fn ensure_user(
    orm: &OrmConn,
    passwords: &PasswordHasher,
    email: &str,
    password: &str,
    role: Role,
) -> anyhow::Result<Uuid> {
    if let Some(existing) = Users::find()
        .filter(users::Column::Email.eq(email))
        .one(orm)
        .await?
    {
        return Ok(existing.id);
    }

    let now = Utc::now().into();
    let user = users::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        password_hash: Set(passwords.hash(password)?),
        role: Set(role.as_str().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(orm)
    .await?;
    Ok(user.id)
}

enum SeedDetails {
    Physical { sku: &'static str, stock: i32, size: Option<&'static str> },
    Service { duration_months: i32, recurring: bool, benefits: &'static str },
}

async fn seed_products(orm: &OrmConn) -> anyhow::Result<()> {
    let catalog = vec![
        (
            "Gym T-Shirt",
            "Dry-fit training shirt",
            79.9,
            SeedDetails::Physical { sku: "TSHIRT-M", stock: 40, size: Some("M") },
        ),
        (
            "Shaker 700ml",
            "Leak-proof protein shaker",
            34.5,
            SeedDetails::Physical { sku: "SHAKER-700", stock: 120, size: None },
        ),
        (
            "Monthly Plan",
            "Unlimited gym access",
            129.0,
            SeedDetails::Service {
                duration_months: 1,
                recurring: true,
                benefits: "Weight room, group classes",
            },
        ),
        (
            "Annual Plan",
            "Twelve months with a discount",
            1190.0,
            SeedDetails::Service {
                duration_months: 12,
                recurring: false,
                benefits: "Weight room, group classes, pool",
            },
        ),
    ];

    for (name, description, price, details) in catalog {
        let exists = Products::find()
            .filter(products::Column::Name.eq(name))
            .one(orm)
            .await?
            .is_some();
        if exists {
            continue;
        }

        let id = Uuid::new_v4();
        let now = Utc::now().into();
        let kind = match details {
            SeedDetails::Physical { .. } => ProductKind::Physical,
            SeedDetails::Service { .. } => ProductKind::Service,
        };
        products::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
            description: Set(description.to_string()),
            price: Set(price),
            kind: Set(kind.as_str().to_string()),
            status: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(orm)
        .await?;

        match details {
            SeedDetails::Physical { sku, stock, size } => {
                physical_products::ActiveModel {
                    product_id: Set(id),
                    sku: Set(sku.to_string()),
                    stock: Set(stock),
                    size: Set(size.map(str::to_string)),
                    color: Set(None),
                    weight: Set(None),
                }
                .insert(orm)
                .await?;
            }
            SeedDetails::Service { duration_months, recurring, benefits } => {
                service_products::ActiveModel {
                    product_id: Set(id),
                    duration_months: Set(duration_months),
                    recurring: Set(recurring),
                    benefits: Set(Some(benefits.to_string())),
                }
                .insert(orm)
                .await?;
            }
        }
    }

    println!("Seeded products");
    Ok(())
}

async fn seed_customer(orm: &OrmConn) -> anyhow::Result<Uuid> {
    let email = "ana.souza@example.com";
    if let Some(existing) = Customers::find()
        .filter(customers::Column::Email.eq(email))
        .one(orm)
        .await?
    {
        return Ok(existing.id);
    }

    let birth_date = NaiveDate::from_ymd_opt(1992, 3, 14)
        .ok_or_else(|| anyhow::anyhow!("invalid seed birth date"))?;
    let now = Utc::now().into();
    let customer = customers::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Ana Souza".to_string()),
        birth_date: Set(birth_date),
        gender: Set(Gender::Female.as_str().to_string()),
        email: Set(email.to_string()),
        phone: Set("+55 81 99999-0000".to_string()),
        tax_id: Set("123.456.789-09".to_string()),
        address: Set("Rua da Aurora, 100".to_string()),
        city: Set("Recife".to_string()),
        state: Set("PE".to_string()),
        postal_code: Set("50050-000".to_string()),
        birthday_flag: Set(false),
        delinquent_flag: Set(false),
        guardian_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(orm)
    .await?;
    Ok(customer.id)
}
