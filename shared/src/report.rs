//! Stock-take report rendering
//!
//! Pure functions from reconciliation results to an email-ready report:
//! a plaintext body and an HTML body, plus the subject line. Two shapes are
//! produced for every stock take: a per-line detail report and a grand-totals
//! summary. No side effects, no database access.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::models::stock_take::{GrandTotals, LineReckoning};
use crate::types::format_currency;

/// A rendered report, ready to hand to the mail dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub subject: String,
    pub plaintext: String,
    pub html: String,
}

fn timestamp(taken_at: DateTime<Utc>) -> String {
    taken_at.format("%d %b %Y, %H:%M:%S UTC").to_string()
}

/// Render the per-line detail report for one completed stock take.
pub fn render_line_report(
    account: &str,
    taken_at: DateTime<Utc>,
    lines: &[LineReckoning],
    currency: &str,
) -> Report {
    let mut plaintext = format!(
        "LINE TOTALS FOR ACCOUNT: {}\n\nReport generated: {}\n",
        account,
        timestamp(taken_at)
    );
    let mut html = format!(
        "<html>\n<body>\n<h1>Line totals for account: {}</h1>\n<p>Report generated: {}</p>\n",
        account,
        timestamp(taken_at)
    );

    for line in lines {
        plaintext.push_str(&format!(
            "\n---\n\
             Stock line: {sku}\n\
             Description: {desc}\n\
             \n\
             Units\n\
             - Opening stock units: {opening}\n\
             - Closing stock units: {closing}\n\
             - Stock units change: {diff}\n\
             - Units transferred since last stock take: {xferred}\n\
             - Units recorded sold since last stock take: {sold}\n\
             - Units recorded shrinkage since last stock take: {shrunk}\n\
             - Units +/- with unrecorded history since last stock take: {unrecorded}\n\
             \n\
             Values\n\
             - Current unit transfer price: {xfer_price}\n\
             - Current unit retail price: {retail_price}\n\
             - Value of units recorded sold since last stock take: {sold_value}\n\
             - Value of units recorded shrinkage since last stock take: {shrinkage_value}\n\
             - Value of units transferred since last stock take: {xferred_value}\n\
             - Value of unrecorded history at present transfer price: {unrecorded_xfer}\n\
             - Value of unrecorded history at present retail price: {unrecorded_retail}\n\
             - Held stock value at present transfer price: {held_xfer}\n\
             - Held stock value at present retail price: {held_retail}\n",
            sku = line.sku,
            desc = line.description,
            opening = line.opening_stock,
            closing = line.closing_stock,
            diff = line.units_diff,
            xferred = line.units_xferred,
            sold = line.units_sold,
            shrunk = line.units_shrunk,
            unrecorded = line.unrecorded_history,
            xfer_price = format_currency(line.xfer_price, currency),
            retail_price = format_currency(line.retail_price, currency),
            sold_value = format_currency(line.sold_value, currency),
            shrinkage_value = format_currency(line.shrinkage_value, currency),
            xferred_value = format_currency(line.xferred_value, currency),
            unrecorded_xfer = format_currency(line.unrecorded_value_at_xfer_price, currency),
            unrecorded_retail = format_currency(line.unrecorded_value_at_retail_price, currency),
            held_xfer = format_currency(line.held_value_at_xfer_price, currency),
            held_retail = format_currency(line.held_value_at_retail_price, currency),
        ));

        html.push_str(&format!(
            "<h2>{sku} — {desc}</h2>\n\
             <h3>Units</h3>\n<ul>\n\
             <li>Opening stock units: {opening}</li>\n\
             <li>Closing stock units: {closing}</li>\n\
             <li>Stock units change: {diff}</li>\n\
             <li>Units transferred since last stock take: {xferred}</li>\n\
             <li>Units recorded sold since last stock take: {sold}</li>\n\
             <li>Units recorded shrinkage since last stock take: {shrunk}</li>\n\
             <li>Units +/- with unrecorded history since last stock take: {unrecorded}</li>\n\
             </ul>\n\
             <h3>Values</h3>\n<ul>\n\
             <li>Current unit transfer price: {xfer_price}</li>\n\
             <li>Current unit retail price: {retail_price}</li>\n\
             <li>Value of units recorded sold since last stock take: {sold_value}</li>\n\
             <li>Value of units recorded shrinkage since last stock take: {shrinkage_value}</li>\n\
             <li>Value of units transferred since last stock take: {xferred_value}</li>\n\
             <li>Value of unrecorded history at present transfer price: {unrecorded_xfer}</li>\n\
             <li>Value of unrecorded history at present retail price: {unrecorded_retail}</li>\n\
             <li>Held stock value at present transfer price: {held_xfer}</li>\n\
             <li>Held stock value at present retail price: {held_retail}</li>\n\
             </ul>\n",
            sku = line.sku,
            desc = line.description,
            opening = line.opening_stock,
            closing = line.closing_stock,
            diff = line.units_diff,
            xferred = line.units_xferred,
            sold = line.units_sold,
            shrunk = line.units_shrunk,
            unrecorded = line.unrecorded_history,
            xfer_price = format_currency(line.xfer_price, currency),
            retail_price = format_currency(line.retail_price, currency),
            sold_value = format_currency(line.sold_value, currency),
            shrinkage_value = format_currency(line.shrinkage_value, currency),
            xferred_value = format_currency(line.xferred_value, currency),
            unrecorded_xfer = format_currency(line.unrecorded_value_at_xfer_price, currency),
            unrecorded_retail = format_currency(line.unrecorded_value_at_retail_price, currency),
            held_xfer = format_currency(line.held_value_at_xfer_price, currency),
            held_retail = format_currency(line.held_value_at_retail_price, currency),
        ));
    }

    html.push_str("</body>\n</html>\n");

    Report {
        subject: format!("[STOCK MANAGEMENT] Stock Take: Lines Report for {}", account),
        plaintext,
        html,
    }
}

/// Render the grand-totals summary report for one completed stock take.
pub fn render_grand_report(
    account: &str,
    taken_at: DateTime<Utc>,
    grand: &GrandTotals,
    currency: &str,
) -> Report {
    let plaintext = format!(
        "WAREHOUSE GRAND TOTALS FOR ACCOUNT: {account}\n\
         \n\
         Report generated: {generated}\n\
         \n\
         ---\n\
         Units\n\
         - Opening stock: {opening}\n\
         - Closing stock: {closing}\n\
         - Transferred since last stock take: {xferred}\n\
         - Recorded sold since last stock take: {sold}\n\
         - Recorded shrinkage since last stock take: {shrunk}\n\
         - Change with unrecorded history since last stock take: {unrecorded}\n\
         \n\
         Values\n\
         - Recorded sold since last stock take: {sold_value}\n\
         - Recorded shrinkage since last stock take: {shrunk_value}\n\
         - Unrecorded history since last stock take at current transfer price: {unrecorded_xfer}\n\
         - Unrecorded history since last stock take at current retail price: {unrecorded_retail}\n\
         - Total transfer value since last stock take: {xferred_value}\n\
         - All time total transfer value: {all_time}\n\
         - Held stock at current transfer price: {held_xfer}\n\
         - Held stock at current retail price: {held_retail}\n",
        account = account,
        generated = timestamp(taken_at),
        opening = grand.held_opening_stock,
        closing = grand.held_closing_stock,
        xferred = grand.units_transferred,
        sold = grand.units_recorded_sold,
        shrunk = grand.units_recorded_shrunk,
        unrecorded = grand.units_unrecorded_history,
        sold_value = format_currency(grand.value_recorded_sold, currency),
        shrunk_value = format_currency(grand.value_recorded_shrunk, currency),
        unrecorded_xfer = format_currency(grand.value_unrecorded_at_xfer_price, currency),
        unrecorded_retail = format_currency(grand.value_unrecorded_at_retail_price, currency),
        xferred_value = format_currency(grand.value_transferred, currency),
        all_time = format_currency(grand.all_time_xfer_value, currency),
        held_xfer = format_currency(grand.held_value_at_xfer_price, currency),
        held_retail = format_currency(grand.held_value_at_retail_price, currency),
    );

    let html = format!(
        "<html>\n<body>\n\
         <h1>Warehouse grand totals for account: {account}</h1>\n\
         <p>Report generated: {generated}</p>\n\
         <h3>Units</h3>\n<ul>\n\
         <li>Opening stock: {opening}</li>\n\
         <li>Closing stock: {closing}</li>\n\
         <li>Transferred since last stock take: {xferred}</li>\n\
         <li>Recorded sold since last stock take: {sold}</li>\n\
         <li>Recorded shrinkage since last stock take: {shrunk}</li>\n\
         <li>Change with unrecorded history since last stock take: {unrecorded}</li>\n\
         </ul>\n\
         <h3>Values</h3>\n<ul>\n\
         <li>Recorded sold since last stock take: {sold_value}</li>\n\
         <li>Recorded shrinkage since last stock take: {shrunk_value}</li>\n\
         <li>Unrecorded history since last stock take at current transfer price: {unrecorded_xfer}</li>\n\
         <li>Unrecorded history since last stock take at current retail price: {unrecorded_retail}</li>\n\
         <li>Total transfer value since last stock take: {xferred_value}</li>\n\
         <li>All time total transfer value: {all_time}</li>\n\
         <li>Held stock at current transfer price: {held_xfer}</li>\n\
         <li>Held stock at current retail price: {held_retail}</li>\n\
         </ul>\n\
         </body>\n</html>\n",
        account = account,
        generated = timestamp(taken_at),
        opening = grand.held_opening_stock,
        closing = grand.held_closing_stock,
        xferred = grand.units_transferred,
        sold = grand.units_recorded_sold,
        shrunk = grand.units_recorded_shrunk,
        unrecorded = grand.units_unrecorded_history,
        sold_value = format_currency(grand.value_recorded_sold, currency),
        shrunk_value = format_currency(grand.value_recorded_shrunk, currency),
        unrecorded_xfer = format_currency(grand.value_unrecorded_at_xfer_price, currency),
        unrecorded_retail = format_currency(grand.value_unrecorded_at_retail_price, currency),
        xferred_value = format_currency(grand.value_transferred, currency),
        all_time = format_currency(grand.all_time_xfer_value, currency),
        held_xfer = format_currency(grand.held_value_at_xfer_price, currency),
        held_retail = format_currency(grand.held_value_at_retail_price, currency),
    );

    Report {
        subject: format!(
            "[STOCK MANAGEMENT] Stock Take: Grand Totals Report for {}",
            account
        ),
        plaintext,
        html,
    }
}

/// Render the notification sent after a single warehouse transfer.
pub fn render_transfer_report(
    requester: &str,
    requester_email: &str,
    sku: &str,
    description: &str,
    units: i64,
    unit_price: Decimal,
    transferred_at: DateTime<Utc>,
    currency: &str,
) -> Report {
    let plaintext = format!(
        "The following transfer has taken place on {when}:\n\
         - Transfer to: {requester} [{email}]\n\
         - Stock line details:\n\
           - SKU: {sku}\n\
           - Description: {description}\n\
           - Units transferred: {units}\n\
           - Unit price: {price}\n",
        when = timestamp(transferred_at),
        requester = requester,
        email = requester_email,
        sku = sku,
        description = description,
        units = units,
        price = format_currency(unit_price, currency),
    );

    let html = format!(
        "<html>\n<body>\n\
         <p>The following transfer has taken place on {when}</p>\n\
         <ul>\n\
         <li>Transfer to: {requester} [<a href=\"mailto:{email}\">{email}</a>]</li>\n\
         <li>Stock line details:\n\
         <ul>\n\
         <li>SKU: {sku}</li>\n\
         <li>Description: {description}</li>\n\
         <li>Units transferred: {units}</li>\n\
         <li>Unit price: {price}</li>\n\
         </ul>\n\
         </li>\n\
         </ul>\n\
         </body>\n</html>\n",
        when = timestamp(transferred_at),
        requester = requester,
        email = requester_email,
        sku = sku,
        description = description,
        units = units,
        price = format_currency(unit_price, currency),
    );

    Report {
        subject: "[STOCK MANAGEMENT] A transfer has taken place!".to_string(),
        plaintext,
        html,
    }
}
