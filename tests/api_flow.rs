//! End-to-end flow through the REST API: register sellers, record sales,
//! then read every aggregate back.

use actix_web::{http::StatusCode, test, web, App};
use cocoa_ledger::api::{configure, cors_headers, AppState};
use cocoa_ledger::contract::{ContractOptions, LedgerContract};
use cocoa_ledger::ledger::LedgerStore;
use serde_json::{json, Value};
use std::sync::Arc;

const WALLET_A: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
const WALLET_B: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

fn in_memory_state() -> web::Data<AppState> {
    web::Data::new(AppState::new(Arc::new(LedgerContract::new(
        ContractOptions::default(),
    ))))
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data($state.clone())
                .wrap(cors_headers())
                .configure(configure),
        )
        .await
    };
}

macro_rules! post_json {
    ($app:expr, $uri:expr, $body:expr) => {{
        let req = test::TestRequest::post()
            .uri($uri)
            .set_json($body)
            .to_request();
        let resp = test::call_service(&$app, req).await;
        let status = resp.status();
        let body: Value = test::read_body_json(resp).await;
        (status, body)
    }};
}

macro_rules! get_json {
    ($app:expr, $uri:expr) => {{
        let req = test::TestRequest::get().uri($uri).to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), StatusCode::OK, "GET {}", $uri);
        let body: Value = test::read_body_json(resp).await;
        body
    }};
}

#[actix_rt::test]
async fn test_full_sales_flow() {
    let state = in_memory_state();
    let app = app!(state);

    let (status, reg_a) = post_json!(app, "/register", json!({ "walletAddress": WALLET_A }));
    assert_eq!(status, StatusCode::OK);
    let seller_a = reg_a["sellerId"].as_str().unwrap().to_string();
    assert_eq!(seller_a, "SEL3f65ad8");

    let (_, reg_b) = post_json!(app, "/register", json!({ "walletAddress": WALLET_B }));
    let seller_b = reg_b["sellerId"].as_str().unwrap().to_string();

    let sales = [
        (&seller_a, "Kumasi Co", 100, 3),
        (&seller_b, "Tema Ltd", 40, 5),
        (&seller_a, "Takoradi", 10, 4),
        (&seller_a, "Accra", 1, 2),
    ];
    for (i, (seller, buyer, qty, price)) in sales.iter().enumerate() {
        let (status, body) = post_json!(
            app,
            "/sale",
            json!({
                "sellerId": seller,
                "buyerName": buyer,
                "quantityKg": qty,
                "price": price
            })
        );
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["success"], true);
        assert_eq!(body["saleId"], i as u64);
        assert_eq!(body["blockIndex"], i as u64 + 1);
        assert!(body["transactionHash"].as_str().unwrap().starts_with("00"));
    }

    let listed = get_json!(app, "/sales");
    assert_eq!(listed["totalSales"], 4);
    assert_eq!(listed["sales"][1]["buyerName"], "Tema Ltd");
    assert_eq!(listed["sales"][1]["quantityKg"], "40");
    assert!(listed["sales"][0]["timestamp"].as_str().unwrap().ends_with('Z'));

    let seller = get_json!(app, &format!("/seller/{}", seller_a));
    assert_eq!(seller["seller"]["totalSales"], "3");
    assert_eq!(seller["seller"]["totalQuantity"], "111");
    assert_eq!(seller["seller"]["totalRevenue"], "342");
    assert_eq!(seller["salesCount"], 3);
    assert_eq!(seller["recentSales"].as_array().unwrap().len(), 3);

    let summary = get_json!(app, "/sales-summary");
    assert_eq!(summary["summary"]["totalSales"], 4);
    assert_eq!(summary["summary"]["totalSellers"], 2);
    assert_eq!(summary["summary"]["totalCocoaSold"], 151);
    assert_eq!(summary["summary"]["totalRevenue"], 542);
    assert_eq!(summary["summary"]["averagePricePerKg"], "3.59");

    let top = summary["topSellers"].as_array().unwrap();
    assert_eq!(top[0]["sellerId"], seller_a.as_str());
    let per_seller_revenue: u64 = top.iter().map(|s| s["revenue"].as_u64().unwrap()).sum();
    let per_seller_quantity: u64 = top.iter().map(|s| s["quantity"].as_u64().unwrap()).sum();
    assert_eq!(per_seller_revenue, 542);
    assert_eq!(per_seller_quantity, 151);

    let chain = get_json!(app, "/blockchain");
    assert_eq!(chain["blockchain"]["totalSales"], "4");
    assert_eq!(chain["blockchain"]["totalSellers"], "2");
    assert_eq!(chain["blockchain"]["totalCocoaSold"], "151");
    assert_eq!(
        chain["blockchain"]["contractAddress"],
        "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512"
    );
    assert_eq!(chain["blockchain"]["height"], 5);

    let blocks = get_json!(app, "/blocks?limit=2");
    assert_eq!(blocks["count"], 2);
    assert_eq!(blocks["blocks"][0]["index"], 4);
    assert_eq!(
        blocks["blocks"][0]["previousBlockHash"],
        blocks["blocks"][1]["hash"]
    );

    let verify = get_json!(app, "/verify");
    assert_eq!(verify["valid"], true);
}

#[actix_rt::test]
async fn test_empty_ledger_summary() {
    let state = in_memory_state();
    let app = app!(state);

    let summary = get_json!(app, "/sales-summary");
    assert_eq!(summary["summary"]["totalSales"], 0);
    assert_eq!(summary["summary"]["averagePricePerKg"], "0.00");
    assert!(summary["topSellers"].as_array().unwrap().is_empty());

    let listed = get_json!(app, "/sales");
    assert_eq!(listed["totalSales"], 0);

    let blocks = get_json!(app, "/blocks");
    assert_eq!(blocks["count"], 1);
    assert_eq!(blocks["blocks"][0]["hash"], "0");
}

#[actix_rt::test]
async fn test_persistent_node_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cocoa.db");

    {
        let contract =
            LedgerContract::open(ContractOptions::default(), LedgerStore::open(&path).unwrap())
                .unwrap();
        let state = web::Data::new(AppState::new(Arc::new(contract)));
        let app = app!(state);
        let (status, _) = post_json!(app, "/register", json!({}));
        assert_eq!(status, StatusCode::OK);
        let (status, _) = post_json!(
            app,
            "/sale",
            json!({ "sellerId": "SEL3f65ad8", "buyerName": "Kumasi Co", "quantityKg": "25", "price": 8 })
        );
        assert_eq!(status, StatusCode::OK);
    }

    let contract =
        LedgerContract::open(ContractOptions::default(), LedgerStore::open(&path).unwrap()).unwrap();
    let state = web::Data::new(AppState::new(Arc::new(contract)));
    let app = app!(state);

    let seller = get_json!(app, "/seller/SEL3f65ad8");
    assert_eq!(seller["seller"]["totalQuantity"], "25");
    assert_eq!(seller["seller"]["totalRevenue"], "200");

    let (status, body) = post_json!(app, "/register", json!({}));
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Seller SEL3f65ad8 is already registered");
}
