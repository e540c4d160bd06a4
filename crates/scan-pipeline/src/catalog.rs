//! Product catalog access over the admin GraphQL API
//!
//! The fetcher only pages and decodes. Authentication, rate limiting and
//! connection reuse belong to the [`AdminGraphql`] implementation, and any
//! transport failure propagates to the caller unchanged.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use shared_types::{Metafield, Product};

use crate::error::CatalogError;

/// Products requested per page when nothing is configured
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Minimal admin GraphQL capability
#[async_trait]
pub trait AdminGraphql: Send + Sync {
    /// Execute a query and return its `data` object.
    ///
    /// GraphQL-level `errors` must be reported as [`CatalogError::Graphql`].
    async fn graphql(&self, query: &str, variables: Value) -> Result<Value, CatalogError>;
}

const PRODUCT_FIELDS: &str = r#"
    id
    title
    handle
    description
    tags
    onlineStoreUrl
    metafields(first: 20) {
      edges { node { namespace key value } }
    }
"#;

pub fn products_query() -> String {
    format!(
        r#"query Products($first: Int!, $after: String) {{
  products(first: $first, after: $after) {{
    pageInfo {{ hasNextPage endCursor }}
    edges {{ node {{ {PRODUCT_FIELDS} }} }}
  }}
}}"#
    )
}

pub fn product_query() -> String {
    format!(
        r#"query Product($id: ID!) {{
  product(id: $id) {{ {PRODUCT_FIELDS} }}
}}"#
    )
}

#[derive(Debug, Deserialize)]
struct ProductsData {
    products: ProductConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductConnection {
    page_info: PageInfo,
    #[serde(default)]
    edges: Vec<ProductEdge>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    #[serde(default)]
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProductEdge {
    node: ProductNode,
}

#[derive(Debug, Deserialize)]
struct SingleProductData {
    product: Option<ProductNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductNode {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    handle: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    online_store_url: Option<String>,
    #[serde(default)]
    metafields: Option<MetafieldConnection>,
}

#[derive(Debug, Deserialize)]
struct MetafieldConnection {
    #[serde(default)]
    edges: Vec<MetafieldEdge>,
}

#[derive(Debug, Deserialize)]
struct MetafieldEdge {
    node: MetafieldNode,
}

#[derive(Debug, Deserialize)]
struct MetafieldNode {
    #[serde(default)]
    namespace: String,
    #[serde(default)]
    key: String,
    #[serde(default)]
    value: Option<String>,
}

impl From<ProductNode> for Product {
    fn from(node: ProductNode) -> Self {
        Product {
            id: node.id,
            title: node.title,
            handle: node.handle,
            description: node.description.unwrap_or_default(),
            tags: node.tags,
            online_store_url: node.online_store_url,
            metafields: node
                .metafields
                .map(|connection| {
                    connection
                        .edges
                        .into_iter()
                        .map(|edge| Metafield {
                            namespace: edge.node.namespace,
                            key: edge.node.key,
                            value: edge.node.value.unwrap_or_default(),
                        })
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(data: Value, what: &str) -> Result<T, CatalogError> {
    serde_json::from_value(data).map_err(|e| CatalogError::Decode(format!("{what}: {e}")))
}

/// Page through the whole catalog in API order
pub async fn fetch_all_products(
    client: &dyn AdminGraphql,
    page_size: u32,
) -> Result<Vec<Product>, CatalogError> {
    let query = products_query();
    let page_size = page_size.max(1);
    let mut products = Vec::new();
    let mut cursor: Option<String> = None;
    let mut page = 0u32;

    loop {
        let data = client
            .graphql(&query, json!({ "first": page_size, "after": cursor }))
            .await?;
        let connection = decode::<ProductsData>(data, "products page")?.products;
        page += 1;

        tracing::debug!(
            page,
            received = connection.edges.len(),
            has_next_page = connection.page_info.has_next_page,
            "fetched product page"
        );

        products.extend(connection.edges.into_iter().map(|edge| Product::from(edge.node)));

        match (connection.page_info.has_next_page, connection.page_info.end_cursor) {
            (true, Some(next)) => cursor = Some(next),
            (true, None) => {
                tracing::warn!(page, "hasNextPage without endCursor; stopping pagination");
                break;
            }
            (false, _) => break,
        }
    }

    Ok(products)
}

/// Fetch one product; `None` when the id does not resolve
pub async fn fetch_product_by_id(
    client: &dyn AdminGraphql,
    product_id: &str,
) -> Result<Option<Product>, CatalogError> {
    let data = client
        .graphql(&product_query(), json!({ "id": product_id }))
        .await?;
    let product = decode::<SingleProductData>(data, "product")?.product;
    Ok(product.map(Product::from))
}
