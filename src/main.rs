use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use std::env;
use std::fs;
use std::path::Path;

use schema_views::config::init_tracing;
use schema_views::service::{import_orders, WashBook};
use schema_views::{process, render_value, total_value, ShippingLabel, Vehicle, View, WashOrder};

fn main() -> Result<()> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("import") => {
            let path = args.get(2).context("usage: schema-views import <orders.json>")?;
            run_import(Path::new(path))?;
        }
        Some("demo") | None => run_demo()?,
        Some(other) => bail!("unknown command `{}` (expected `import` or `demo`)", other),
    }

    Ok(())
}

fn run_import(path: &Path) -> Result<()> {
    println!("📦 Order Import");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let raw: Value = serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    let records = match raw {
        Value::Array(records) => records,
        single @ Value::Object(_) => vec![single],
        _ => bail!("{} must contain an order or a list of orders", path.display()),
    };

    let report = import_orders(&records);

    for order in &report.accepted {
        println!("\n✓ {}", order.id());
        println!("  public: {}", render_value(order, View::Public));
        let label = ShippingLabel::from_order(order)?;
        println!("  label:  {}", render_value(&label, View::Wire));
    }

    for rejection in &report.rejected {
        println!("\n✗ record #{}", rejection.index);
        println!("  {}", rejection.error.to_string().replace('\n', "\n  "));
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("{}", report.summary());
    Ok(())
}

fn run_demo() -> Result<()> {
    println!("🚗 Car Wash Walkthrough");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let owner = json!({
        "name": "John Doe",
        "email": "john.doe@example.com",
        "phone": "1234567890",
        "document": "1234567890",
    });
    let car = json!({
        "brand": "toyota",
        "model": "Corolla",
        "color": "white",
        "plate": "aaa1234",
        "owner": owner,
    });

    println!("\n1) Plate normalization");
    let vehicle: Vehicle = process(&car)?;
    println!("   valid plate normalized: {}", vehicle.plate());

    println!("\n2) Invalid plate");
    let mut bad_plate = car.clone();
    bad_plate["plate"] = json!("AA12345");
    if let Err(err) = process::<Vehicle>(&bad_plate) {
        println!("   {}", first_message(&err));
    }

    println!("\n3) Closed set");
    let mut bad_brand = car.clone();
    bad_brand["brand"] = json!("fiat");
    if let Err(err) = process::<Vehicle>(&bad_brand) {
        println!("   {}", first_message(&err));
    }

    println!("\n4) Entity rule + computed total");
    let services = json!([
        {"name": "Basic Wash", "price": "10.00"},
        {"name": "Premium Wash", "price": "25.00"},
    ]);
    let order: WashOrder = process(&json!({"vehicle": car, "services": services}))?;
    println!("   total_price: {}", total_value(order.total_price()));
    if let Err(err) = process::<WashOrder>(&json!({"vehicle": car, "services": []})) {
        println!("   {}", first_message(&err));
    }

    println!("\n5) Views");
    println!("   internal: {}", render_value(&order, View::Internal));
    println!("   public:   {}", render_value(&order, View::Public));

    println!("\n6) Aggregate");
    let mut book = WashBook::new();
    book.add_vehicle(&car)?;
    for service in services.as_array().into_iter().flatten() {
        book.add_service(service)?;
    }
    book.add_order(&json!({"vehicle": car, "services": services}))?;
    println!("   {}", book.summary());

    Ok(())
}

fn first_message(err: &schema_views::EngineError) -> String {
    err.report()
        .and_then(|report| report.violations.first())
        .map(|v| v.to_string())
        .unwrap_or_else(|| err.to_string())
}
