use stockpile_core::models::ProductDraft;

use crate::commands::common::Context;
use crate::error::CliError;

pub async fn run_add(
    context: &Context,
    name: String,
    sku: Option<String>,
    quantity: i64,
    price_cents: i64,
) -> Result<(), CliError> {
    let draft = ProductDraft {
        name,
        sku,
        quantity,
        price_cents,
    };

    let client = context.client()?;
    let product = client.create(&draft).await?;
    println!("{}", product.id);
    Ok(())
}
