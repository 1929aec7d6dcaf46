//! Initial data for an empty database

use anyhow::Result;
use auth::{models::NewUser, repositories::UserRepository};
use tracing::info;

use crate::{models::NewProduct, repositories::ProductRepository};

const SEED_PASSWORD: &str = "password123";

/// Insert the default users and products when their tables are empty
///
/// Seeded users start inactive; the flag flips on their first login.
pub async fn populate_initial_data(
    users: &UserRepository,
    products: &ProductRepository,
) -> Result<()> {
    if users.count().await? == 0 {
        for (username, role, department) in [
            ("admin", "admin", "IT"),
            ("user1", "user", "Sales"),
            ("user2", "user", "Marketing"),
        ] {
            users
                .create(&NewUser {
                    username: username.to_string(),
                    password: SEED_PASSWORD.to_string(),
                    role: role.to_string(),
                    department: department.to_string(),
                })
                .await?;
        }
        info!("Seeded default users");
    }

    if products.count().await? == 0 {
        for (name, description, price, stock) in [
            ("Product A", "Description of product A", 1000.0, 10),
            ("Product B", "Description of product B", 2000.0, 15),
            ("Product C", "Description of product C", 3000.0, 20),
        ] {
            products
                .create(&NewProduct {
                    name: name.to_string(),
                    description: description.to_string(),
                    price,
                    stock,
                })
                .await?;
        }
        info!("Seeded default products");
    }

    Ok(())
}
