use crate::commands::common::{
    format_product_lines, product_to_list_item, Context, ProductListItem,
};
use crate::error::CliError;

pub async fn run_list(
    context: &Context,
    limit: usize,
    offset: usize,
    as_json: bool,
) -> Result<(), CliError> {
    let client = context.client()?;
    let products = client.list(limit, offset).await?;

    if as_json {
        let json_items = products
            .iter()
            .map(product_to_list_item)
            .collect::<Vec<ProductListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if products.is_empty() {
        println!("No products.");
        return Ok(());
    }

    for line in format_product_lines(&products) {
        println!("{line}");
    }
    Ok(())
}
