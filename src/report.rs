//! Human readable end-of-run report.

use crate::core::stats::StatsSnapshot;
use crate::core::types::FuelType;
use std::fmt::Write;

const RULE: &str = "-----------------------------------------------------------------";
const SUB_RULE: &str = "-------------------------------";

/// `numerator / denominator`, or `None` when the denominator is zero
pub fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        None
    } else {
        Some(numerator / denominator)
    }
}

fn value(v: Option<f64>, suffix: &str) -> String {
    match v {
        Some(v) if suffix.is_empty() => format!("{:.2}", v),
        Some(v) => format!("{:.2} {}", v, suffix),
        None => "n/a".to_string(),
    }
}

/// Render the final report. Undefined averages print as `n/a`.
pub fn render(s: &StatsSnapshot) -> String {
    let spawned = s.cars_spawned as f64;
    let refueled = s.refueled_total() as f64;
    let checked_out = s.checked_out_total() as f64;
    let mut out = String::new();

    // writing into a String cannot fail
    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(out, "Total cars: {}", s.cars_spawned);
    let _ = writeln!(out, "Cars refueled total: {}", s.refueled_total());
    let _ = writeln!(out, "Cars refueled by fuel type: {:?}", s.cars_refueled.values());
    let _ = writeln!(out, "Cars checked out total: {}", s.checked_out_total());
    let _ = writeln!(out, "Cars not served: {}", s.cars_not_served);
    let _ = writeln!(
        out,
        "Cars checked out rate: {}",
        value(ratio(checked_out * 100.0, spawned), "%")
    );
    let _ = writeln!(
        out,
        "Cars not served rate: {}",
        value(ratio(s.cars_not_served as f64 * 100.0, spawned), "%")
    );

    let _ = writeln!(out, "{}", SUB_RULE);
    let _ = writeln!(
        out,
        "Average receipt: {}",
        value(ratio(s.cash_total(), checked_out), "€")
    );
    for fuel in FuelType::ALL {
        let _ = writeln!(
            out,
            "Average receipt {}: {}",
            fuel,
            value(ratio(s.cash_per_fuel[fuel], s.cars_checked_out[fuel] as f64), "€")
        );
    }

    let _ = writeln!(out, "{}", SUB_RULE);
    let _ = writeln!(
        out,
        "Average units refueled: {}",
        value(ratio(s.units_total(), refueled), "")
    );
    for fuel in FuelType::ALL {
        let _ = writeln!(
            out,
            "Average {} dispensed: {}",
            fuel,
            value(ratio(s.units_per_fuel[fuel], s.cars_refueled[fuel] as f64), fuel.unit())
        );
    }

    let _ = writeln!(out, "{}", SUB_RULE);
    let _ = writeln!(
        out,
        "Average time spent refueling: {}",
        value(ratio(s.refueling_time_total(), refueled), "s")
    );
    for fuel in FuelType::ALL {
        let _ = writeln!(
            out,
            "Average time spent refueling {}: {}",
            fuel,
            value(ratio(s.time_refueling[fuel], s.cars_refueled[fuel] as f64), "s")
        );
    }
    let _ = writeln!(
        out,
        "Average time spent checking out: {}",
        value(ratio(s.checkout_time_total, checked_out), "s")
    );
    let _ = writeln!(
        out,
        "Average time spent in checkout queue: {}",
        value(ratio(s.time_in_checkout_queue, checked_out), "s")
    );
    let _ = writeln!(
        out,
        "Average time spent in queue before leaving: {}",
        value(ratio(s.time_before_leaving, s.cars_not_served as f64), "s")
    );
    let _ = writeln!(
        out,
        "Average time spent at gas station: {}",
        value(
            ratio(
                s.refueling_time_total() + s.checkout_time_total + s.time_in_checkout_queue,
                checked_out
            ),
            "s"
        )
    );
    let _ = writeln!(out, "{}", RULE);
    out
}
