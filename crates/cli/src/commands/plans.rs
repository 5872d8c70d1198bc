//! Billing plan table.

use growth_pilot_core::billing::{PLANS, Plan};
use growth_pilot_core::{CurrencyCode, format_currency};

fn price(plan: &Plan) -> String {
    if plan.is_free() {
        "free".to_string()
    } else {
        format!("{}/mo", format_currency(plan.price, CurrencyCode::USD))
    }
}

fn row(plan: &Plan) -> String {
    format!(
        "{:<12} {:<12} {:>10} {:>6}d  {}",
        plan.id,
        plan.name,
        price(plan),
        plan.trial_days,
        plan.ai_analyses
    )
}

#[allow(clippy::print_stdout)]
pub fn print() {
    println!(
        "{:<12} {:<12} {:>10} {:>7}  AI analyses",
        "ID", "NAME", "PRICE", "TRIAL"
    );
    for plan in &PLANS {
        println!("{}", row(plan));
    }
}
