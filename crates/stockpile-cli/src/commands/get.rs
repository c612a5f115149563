use crate::commands::common::{parse_product_id, print_product, Context};
use crate::error::CliError;

pub async fn run_get(context: &Context, id: &str, as_json: bool) -> Result<(), CliError> {
    let id = parse_product_id(id)?;
    let client = context.client()?;
    let product = client.get(id).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&product)?);
    } else {
        print_product(&product);
    }
    Ok(())
}
