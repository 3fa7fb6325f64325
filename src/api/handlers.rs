use crate::api::error::ApiError;
use crate::api::AppState;
use crate::error::LedgerError;
use crate::ledger::validator::SaleValidator;
use crate::ledger::{Block, Sale, SalesSummary};
use actix_web::{web, HttpResponse};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

const RECENT_SALES: usize = 5;
const TOP_SELLERS: usize = 5;
const DEFAULT_BLOCK_LIMIT: usize = 10;
const MAX_BLOCK_LIMIT: usize = 100;

type ApiResult = Result<HttpResponse, ApiError>;

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub wallet_address: Option<String>,
}

/// Raw sale body. Everything is optional so validation can report what is missing.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct SaleRequest {
    #[serde(default)]
    pub seller_id: Option<String>,
    #[serde(default)]
    pub buyer_name: Option<String>,
    #[serde(default)]
    pub quantity_kg: Option<Value>,
    #[serde(default)]
    pub price: Option<Value>,
}

#[derive(Deserialize, Debug)]
pub struct BlocksQuery {
    pub limit: Option<usize>,
}

/// Sale as rendered to clients; amounts are decimal strings.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct SaleView {
    sale_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    seller_id: Option<String>,
    buyer_name: String,
    quantity_kg: String,
    price: String,
    timestamp: String,
}

impl SaleView {
    fn new(sale: &Sale, with_seller: bool) -> Self {
        SaleView {
            sale_id: sale.sale_id.to_string(),
            seller_id: with_seller.then(|| sale.seller_id.clone()),
            buyer_name: sale.buyer_name.clone(),
            quantity_kg: sale.quantity_kg.to_string(),
            price: sale.price.to_string(),
            timestamp: iso_timestamp(sale.timestamp),
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct SummaryTotals {
    total_sales: u64,
    total_sellers: u64,
    total_cocoa_sold: u64,
    total_revenue: u128,
    average_price_per_kg: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct TopSeller {
    seller_id: String,
    sales: u64,
    quantity: u64,
    revenue: u128,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct SummaryResponse {
    success: bool,
    summary: SummaryTotals,
    top_sellers: Vec<TopSeller>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct BlocksResponse {
    success: bool,
    count: usize,
    blocks: Vec<Block>,
}

fn iso_timestamp(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}

/// GET /
pub async fn index() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "message": "CocoaChain API v1.0 is running",
        "endpoints": {
            "GET /": "API info",
            "POST /register": "Register as seller (returns sellerId)",
            "POST /sale": "Record a sale",
            "GET /sales": "Get all sales",
            "GET /seller/:sellerId": "Get seller details",
            "GET /sales-summary": "Get sales statistics",
            "GET /blockchain": "Get blockchain info",
            "GET /mine": "Mining information",
            "GET /blocks": "Latest sealed blocks (?limit=N)",
            "GET /verify": "Validate chain linkage and proof of work",
            "GET /health": "Health check"
        }
    }))
}

/// POST /register
pub async fn register(state: web::Data<AppState>, body: web::Bytes) -> ApiResult {
    let request = parse_register_body(&body)?;
    let wallet = request
        .wallet_address
        .filter(|w| !w.trim().is_empty())
        .unwrap_or_else(|| state.contract.operator_wallet().to_string());

    let registration = state.contract.register_seller(&wallet).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "sellerId": registration.seller_id,
        "walletAddress": registration.wallet_address,
        "transactionHash": registration.transaction_hash,
        "message": "Seller registered successfully"
    })))
}

/// An empty body registers the operator wallet; anything else must be valid JSON.
fn parse_register_body(body: &[u8]) -> Result<RegisterRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(RegisterRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))
}

/// POST /sale
pub async fn record_sale(state: web::Data<AppState>, body: web::Json<SaleRequest>) -> ApiResult {
    let request = body.into_inner();
    let sale = SaleValidator::new().validate_request(
        request.seller_id.as_deref(),
        request.buyer_name.as_deref(),
        request.quantity_kg.as_ref(),
        request.price.as_ref(),
    )?;

    if !state.contract.is_seller_registered(&sale.seller_id).await? {
        return Err(LedgerError::SellerNotRegistered(sale.seller_id).into());
    }

    let receipt = state
        .contract
        .record_sale(&sale.seller_id, &sale.buyer_name, sale.quantity_kg, sale.price)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "transactionHash": receipt.transaction_hash,
        "saleId": receipt.sale_id,
        "blockIndex": receipt.block_index,
        "message": "Sale recorded successfully",
        "data": {
            "sellerId": sale.seller_id,
            "buyerName": sale.buyer_name,
            "quantityKg": sale.quantity_kg,
            "price": sale.price
        }
    })))
}

/// GET /sale
pub async fn sale_usage() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "message": "Use POST /sale to record a sale",
        "body": {
            "sellerId": "SEL3f65ad8",
            "buyerName": "John Doe",
            "quantityKg": 100,
            "price": 50
        }
    }))
}

/// GET /sales
pub async fn list_sales(state: web::Data<AppState>) -> ApiResult {
    let sales = state.contract.all_sales().await?;
    let views: Vec<SaleView> = sales.iter().map(|s| SaleView::new(s, true)).collect();

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "totalSales": views.len(),
        "sales": views
    })))
}

/// GET /seller/{seller_id}
pub async fn seller(state: web::Data<AppState>, path: web::Path<String>) -> ApiResult {
    let seller_id = path.into_inner();
    let record = state.contract.seller_details(&seller_id).await?;
    let sales = state.contract.seller_sales(&seller_id).await?;

    let recent: Vec<SaleView> = sales
        .iter()
        .skip(sales.len().saturating_sub(RECENT_SALES))
        .map(|s| SaleView::new(s, false))
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "seller": {
            "sellerId": record.seller_id,
            "walletAddress": record.wallet_address,
            "totalSales": record.total_sales.to_string(),
            "totalQuantity": record.total_quantity.to_string(),
            "totalRevenue": record.total_revenue.to_string()
        },
        "salesCount": sales.len(),
        "recentSales": recent
    })))
}

/// GET /sales-summary
pub async fn sales_summary(state: web::Data<AppState>) -> ApiResult {
    let sales = state.contract.all_sales().await?;
    let sellers = state.contract.sellers_count().await?;
    let summary = SalesSummary::from_sales(&sales);

    let top_sellers = summary
        .top_sellers(TOP_SELLERS)
        .into_iter()
        .map(|(id, stats)| TopSeller {
            seller_id: id.to_string(),
            sales: stats.sales,
            quantity: stats.quantity,
            revenue: stats.revenue,
        })
        .collect();

    Ok(HttpResponse::Ok().json(SummaryResponse {
        success: true,
        summary: SummaryTotals {
            total_sales: summary.total_sales,
            total_sellers: sellers,
            total_cocoa_sold: summary.total_cocoa,
            total_revenue: summary.total_revenue,
            average_price_per_kg: summary.average_price_per_kg.clone(),
        },
        top_sellers,
    }))
}

/// GET /blockchain
pub async fn blockchain(state: web::Data<AppState>) -> ApiResult {
    let contract = &state.contract;
    let total_sales = contract.sales_count().await?;
    let total_sellers = contract.sellers_count().await?;
    let total_cocoa = contract.total_cocoa_sold().await?;
    let height = contract.chain_height().await?;
    let latest_hash = contract
        .latest_blocks(1)
        .await?
        .first()
        .map(|b| b.hash.clone())
        .unwrap_or_default();

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "blockchain": {
            "totalSales": total_sales.to_string(),
            "totalSellers": total_sellers.to_string(),
            "totalCocoaSold": total_cocoa.to_string(),
            "contractAddress": contract.address(),
            "height": height,
            "latestBlockHash": latest_hash
        }
    })))
}

/// GET /mine
pub async fn mine() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "message": "Mining is automatic: every recorded sale is sealed into its own block.",
        "note": "Blocks are mined with a SHA-256 proof of work when POST /sale succeeds; there is nothing to trigger manually."
    }))
}

/// GET /blocks
pub async fn blocks(state: web::Data<AppState>, query: web::Query<BlocksQuery>) -> ApiResult {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_BLOCK_LIMIT)
        .clamp(1, MAX_BLOCK_LIMIT);
    let blocks = state.contract.latest_blocks(limit).await?;

    Ok(HttpResponse::Ok().json(BlocksResponse {
        success: true,
        count: blocks.len(),
        blocks,
    }))
}

/// GET /verify
pub async fn verify(state: web::Data<AppState>) -> ApiResult {
    let height = state.contract.chain_height().await?;
    match state.contract.verify_chain().await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "valid": true,
            "height": height
        }))),
        Err(LedgerError::InvalidChain(reason)) => {
            info!(reason = %reason, "Chain verification failed");
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "valid": false,
                "height": height,
                "error": reason
            })))
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /health
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
    }))
}

/// CORS preflight
pub async fn preflight() -> HttpResponse {
    HttpResponse::NoContent().finish()
}
