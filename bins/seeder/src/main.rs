//! Database seeder for Tally development and testing.
//!
//! Seeds the chart of accounts named by the ledger configuration, a few
//! operating accounts, and one demo client and supplier. Safe to re-run:
//! anything that already exists is skipped.
//!
//! Usage: cargo run --bin seeder

use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait};
use tally_core::ledger::AccountType;
use tally_db::entities::{clients, suppliers};
use tally_db::repositories::{AccountRepository, CreateAccountInput, SubjectRepository};
use tally_db::Ledger;
use tally_shared::AppConfig;
use tally_shared::config::AccountCodes;
use tally_shared::telemetry::init_tracing;
use tracing::info;

/// Accounts every installation needs besides the posting roles.
const OPERATING_ACCOUNTS: &[(&str, &str, AccountType)] = &[
    ("1100", "Cash on Hand", AccountType::Cash),
    ("1110", "Main Bank Account", AccountType::Cash),
    ("3100", "Owner's Equity", AccountType::Equity),
    ("5200", "Office Expense", AccountType::Expense),
    ("5400", "Rent Expense", AccountType::Expense),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    init_tracing(&config.logging)?;

    println!("Connecting to database...");
    let db = tally_db::connect_with(&config.database).await?;

    println!("Seeding chart of accounts...");
    seed_chart(&db, &config.ledger.accounts).await?;

    println!("Seeding demo subjects...");
    seed_subjects(&db).await?;

    println!("Checking posting accounts...");
    Ledger::open(db, &config.ledger).await?;

    println!("Seeding complete!");
    Ok(())
}

/// Role accounts in the order they appear in a printed chart.
fn role_accounts(codes: &AccountCodes) -> Vec<(String, &'static str, AccountType)> {
    let mut accounts = vec![
        (codes.receivable.clone(), "Accounts Receivable", AccountType::Receivable),
        (codes.payable.clone(), "Accounts Payable", AccountType::Payable),
    ];
    let optional = [
        (&codes.inventory, "Inventory", AccountType::Asset),
        (&codes.tax_control, "Input Tax Receivable", AccountType::Asset),
        (
            &codes.accumulated_depreciation,
            "Accumulated Depreciation",
            AccountType::ContraAsset,
        ),
        (&codes.sales_tax_payable, "Sales Tax Payable", AccountType::Liability),
        (&codes.accrued_expenses, "Accrued Expenses", AccountType::Liability),
        (&codes.sales_revenue, "Sales Revenue", AccountType::Revenue),
        (&codes.cost_of_goods_sold, "Cost of Goods Sold", AccountType::Expense),
        (
            &codes.depreciation_expense,
            "Depreciation Expense",
            AccountType::Expense,
        ),
    ];
    for (code, name, account_type) in optional {
        if let Some(code) = code {
            accounts.push((code.clone(), name, account_type));
        }
    }
    accounts
}

async fn seed_chart(db: &DatabaseConnection, codes: &AccountCodes) -> anyhow::Result<()> {
    let repo = AccountRepository::new(db.clone());

    let mut chart = role_accounts(codes);
    chart.extend(
        OPERATING_ACCOUNTS
            .iter()
            .map(|(code, name, account_type)| ((*code).to_string(), *name, *account_type)),
    );
    chart.sort_by(|a, b| a.0.cmp(&b.0));

    for (code, name, account_type) in chart {
        if repo.find_by_code(&code).await?.is_some() {
            println!("  Account {code} already exists, skipping...");
            continue;
        }
        repo.create_account(CreateAccountInput::new(code.as_str(), name, account_type))
            .await?;
        println!("  Created account {code} {name}");
    }
    Ok(())
}

async fn seed_subjects(db: &DatabaseConnection) -> anyhow::Result<()> {
    let repo = SubjectRepository::new(db.clone());

    if clients::Entity::find().count(db).await? > 0 {
        println!("  Clients already exist, skipping...");
    } else {
        let id = repo.create_client("Demo Client").await?;
        info!(client_id = %id, "Seeded demo client");
    }

    if suppliers::Entity::find().count(db).await? > 0 {
        println!("  Suppliers already exist, skipping...");
    } else {
        let id = repo.create_supplier("Demo Supplier").await?;
        info!(supplier_id = %id, "Seeded demo supplier");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_roles_are_all_seeded() {
        let accounts = role_accounts(&AccountCodes::default());
        assert_eq!(accounts.len(), 10);
        assert_eq!(accounts[0].0, "1200");
        assert!(accounts.iter().any(|(code, _, t)| code == "1590" && *t == AccountType::ContraAsset));
    }

    #[test]
    fn test_operating_codes_do_not_collide_with_roles() {
        let roles = role_accounts(&AccountCodes::default());
        for (code, _, _) in OPERATING_ACCOUNTS {
            assert!(roles.iter().all(|(role_code, _, _)| role_code != code));
        }
    }
}
