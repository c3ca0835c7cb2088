use crate::charts::ChartView;
use crate::dom::Document;
use crate::models::{OrderDetail, OrderSummary};

pub const RECENT_ORDER_COLUMNS: usize = 5;
pub const ORDER_TABLE_COLUMNS: usize = 9;
pub const CURRENCY: &str = "\u{20b9}";
pub const NO_SALES_TEXT: &str = "No sales data yet";

const VISIBLE_ITEM_CHIPS: usize = 2;

/// Rendered table-body markup plus the checkbox values it contains.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    pub html: String,
    pub row_ids: Vec<String>,
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn format_amount(amount: f64) -> String {
    format!("{CURRENCY}{}", amount.round() as i64)
}

pub fn avatar_hue(user_id: u64) -> u64 {
    (user_id % 360 + 100) % 360
}

fn avatar_initial(username: &str) -> String {
    username
        .chars()
        .next()
        .map(|ch| ch.to_uppercase().collect())
        .unwrap_or_else(|| "?".to_string())
}

fn item_chips(order: &OrderSummary) -> String {
    let mut html = String::new();
    for item in order.items.iter().take(VISIBLE_ITEM_CHIPS) {
        html.push_str(&format!(
            "<span class=\"order-item-chip\">{}\u{00d7} {}</span>",
            item.quantity,
            escape_html(&item.item_name)
        ));
    }
    if order.items_count > VISIBLE_ITEM_CHIPS {
        html.push_str(&format!(
            "<span class=\"order-item-chip overflow\">+{}</span>",
            order.items_count - VISIBLE_ITEM_CHIPS
        ));
    }
    html
}

fn user_cell(order: &OrderSummary, with_email: bool) -> String {
    let email = if with_email {
        let email = order
            .email
            .as_deref()
            .filter(|email| !email.is_empty())
            .map(escape_html)
            .unwrap_or_else(|| "-".to_string());
        format!("<span class=\"user-cell-email\">{email}</span>")
    } else {
        String::new()
    };
    format!(
        "<div class=\"user-cell\"><div class=\"user-cell-avatar\" style=\"background:hsl({},50%,60%);\">{}</div>\
         <div class=\"user-cell-info\"><span class=\"user-cell-name\">{}</span>{}</div></div>",
        avatar_hue(order.user_id),
        escape_html(&avatar_initial(&order.username)),
        escape_html(&order.username),
        email
    )
}

fn status_badge(status: &str, display: &str) -> String {
    format!(
        "<span class=\"status-badge {}\">{}</span>",
        escape_html(status),
        escape_html(display)
    )
}

fn empty_row(columns: usize, body: &str) -> String {
    format!("<tr><td colspan=\"{columns}\" class=\"admin-empty\">{body}</td></tr>")
}

/// Rows of the dashboard's recent-orders table.
pub fn render_recent_orders(orders: &[OrderSummary]) -> Fragment {
    if orders.is_empty() {
        return Fragment {
            html: empty_row(RECENT_ORDER_COLUMNS, "No orders yet"),
            row_ids: Vec::new(),
        };
    }

    let mut html = String::new();
    for order in orders {
        html.push_str("<tr>");
        html.push_str(&format!(
            "<td class=\"token\">#{}</td>",
            escape_html(&order.token_number)
        ));
        html.push_str(&format!("<td>{}</td>", user_cell(order, false)));
        html.push_str(&format!(
            "<td><div class=\"order-items-cell\">{}</div></td>",
            item_chips(order)
        ));
        html.push_str(&format!(
            "<td class=\"amount\">{}</td>",
            format_amount(order.total_amount)
        ));
        html.push_str(&format!(
            "<td>{}</td>",
            status_badge(&order.status, &order.status_display)
        ));
        html.push_str("</tr>");
    }
    Fragment {
        html,
        row_ids: Vec::new(),
    }
}

/// Rows of the orders page table, one selectable checkbox per order.
pub fn render_order_rows(orders: &[OrderSummary]) -> Fragment {
    if orders.is_empty() {
        return Fragment {
            html: empty_row(
                ORDER_TABLE_COLUMNS,
                "<h3>No orders found</h3><p>Try adjusting your filters</p>",
            ),
            row_ids: Vec::new(),
        };
    }

    let mut html = String::new();
    let mut row_ids = Vec::with_capacity(orders.len());
    for order in orders {
        let row_id = order.id.map(|id| id.to_string()).unwrap_or_default();
        let scheduled = match order.scheduled_for.as_deref() {
            Some(when) if !when.is_empty() => format!(
                "<span class=\"status-badge scheduled\">\u{1f4c5} {}</span>",
                escape_html(when)
            ),
            _ => "<span class=\"muted\">-</span>".to_string(),
        };
        let created = order
            .created_at
            .as_deref()
            .map(escape_html)
            .unwrap_or_else(|| "-".to_string());
        let view_button = match order.id {
            Some(id) => format!(
                "<button type=\"button\" class=\"action-btn view\" title=\"View Details\" data-order-id=\"{id}\">View</button>"
            ),
            None => String::new(),
        };

        html.push_str("<tr>");
        html.push_str(&format!(
            "<td><input type=\"checkbox\" name=\"order_ids\" value=\"{}\"></td>",
            escape_html(&row_id)
        ));
        html.push_str(&format!(
            "<td class=\"token\">#{}</td>",
            escape_html(&order.token_number)
        ));
        html.push_str(&format!("<td>{}</td>", user_cell(order, true)));
        html.push_str(&format!(
            "<td><div class=\"order-items-cell\">{}</div></td>",
            item_chips(order)
        ));
        html.push_str(&format!("<td>{scheduled}</td>"));
        html.push_str(&format!(
            "<td class=\"amount\">{}</td>",
            format_amount(order.total_amount)
        ));
        html.push_str(&format!(
            "<td>{}</td>",
            status_badge(&order.status, &order.status_display)
        ));
        html.push_str(&format!("<td class=\"muted\">{created}</td>"));
        html.push_str(&format!(
            "<td><div class=\"action-buttons\">{view_button}</div></td>"
        ));
        html.push_str("</tr>");

        if !row_id.is_empty() {
            row_ids.push(row_id);
        }
    }
    Fragment { html, row_ids }
}

pub fn render_modal_loading() -> String {
    "<div class=\"modal-loading\"><div class=\"modal-spinner\"></div><span>Loading order details\u{2026}</span></div>"
        .to_string()
}

pub fn render_modal_error(message: &str) -> String {
    format!(
        "<div class=\"modal-error\">\u{26a0}\u{fe0f} {}</div>",
        escape_html(message)
    )
}

pub fn render_modal_footer() -> String {
    "<button type=\"button\" class=\"admin-btn admin-btn-outline\" data-action=\"close\">Close</button>"
        .to_string()
}

fn info_item(label: &str, value: &str) -> String {
    format!(
        "<div class=\"modal-info-item\"><div class=\"modal-info-label\">{label}</div>\
         <div class=\"modal-info-value\">{value}</div></div>"
    )
}

/// Full order detail. Line subtotals are computed here; the grand total is
/// shown exactly as the server reported it.
pub fn render_order_detail(detail: &OrderDetail) -> String {
    let status_class = detail.status.as_deref().unwrap_or("pending");
    let email = detail
        .user
        .email
        .as_deref()
        .map(escape_html)
        .unwrap_or_else(|| "-".to_string());

    let mut html = String::from("<div class=\"modal-info-grid\">");
    html.push_str(&info_item("Customer", &escape_html(&detail.user.username)));
    html.push_str(&info_item("Email", &email));
    html.push_str(&info_item("Date", &escape_html(&detail.created_at)));
    if let Some(when) = detail.scheduled_for.as_deref() {
        html.push_str(&info_item(
            "Scheduled For",
            &format!("\u{1f4c5} {}", escape_html(when)),
        ));
    }
    html.push_str(&info_item(
        "Status",
        &status_badge(status_class, &detail.status_display),
    ));
    html.push_str(&info_item(
        "Payment",
        &escape_html(detail.payment_status.as_deref().unwrap_or("N/A")),
    ));
    html.push_str("</div>");

    html.push_str(
        "<div class=\"modal-section\"><div class=\"modal-section-title\">\u{1f4e6} Order Items</div>\
         <table class=\"modal-items-table\"><thead><tr><th>Item</th><th>Qty</th><th>Price</th><th>Subtotal</th></tr></thead><tbody>",
    );
    for item in &detail.items {
        html.push_str(&format!(
            "<tr><td class=\"modal-item-name\">{}</td><td>\u{00d7}{}</td><td>{}</td><td>{}</td></tr>",
            escape_html(&item.name),
            item.quantity,
            format_amount(item.price),
            format_amount(item.subtotal())
        ));
    }
    html.push_str("</tbody></table></div>");

    html.push_str(&format!(
        "<div class=\"modal-total-row\"><span>Grand Total</span><span class=\"modal-total-amount\">{CURRENCY}{}</span></div>",
        detail.total_amount
    ));
    html
}

fn text_of(doc: &Document, id: &str) -> String {
    escape_html(doc.text(id).unwrap_or("-"))
}

fn html_of(doc: &Document, id: &str) -> String {
    doc.html(id).unwrap_or_default().to_string()
}

fn render_chart(chart: &ChartView) -> String {
    let max = chart
        .values
        .iter()
        .copied()
        .fold(0.0_f64, f64::max)
        .max(1.0);
    let mut html = format!(
        "<figure class=\"chart {}\"><figcaption>{}</figcaption><ul>",
        chart.kind.as_str(),
        chart.slot.title()
    );
    for (label, value) in chart.labels.iter().zip(&chart.values) {
        let pct = (value / max * 100.0).clamp(0.0, 100.0);
        html.push_str(&format!(
            "<li><span class=\"label\">{}</span><span class=\"bar\" style=\"width:{pct:.0}%\"></span><b>{}</b></li>",
            escape_html(label),
            value.round() as i64
        ));
    }
    html.push_str("</ul></figure>");
    html
}

/// Server-rendered snapshot of the live document.
pub fn render_index(doc: &Document, charts: &[ChartView], updated_at: &str) -> String {
    let charts_html = if charts.is_empty() {
        format!("<p class=\"muted\">{NO_SALES_TEXT}</p>")
    } else {
        charts.iter().map(render_chart).collect()
    };
    INDEX_HTML
        .replace("{{UPDATED}}", &escape_html(updated_at))
        .replace("{{TOTAL_REVENUE}}", &text_of(doc, "statTotalRevenue"))
        .replace("{{TOTAL_ORDERS}}", &text_of(doc, "statTotalOrders"))
        .replace("{{ACTIVE_ORDERS}}", &text_of(doc, "statActiveOrders"))
        .replace("{{TOTAL_USERS}}", &text_of(doc, "statTotalUsers"))
        .replace("{{TODAYS_REVENUE}}", &text_of(doc, "statTodaysRevenue"))
        .replace("{{TODAYS_ORDERS}}", &text_of(doc, "statTodaysOrders"))
        .replace("{{NEW_USERS}}", &text_of(doc, "statNewUsers"))
        .replace("{{RECENT_ORDERS}}", &html_of(doc, "recentOrdersBody"))
        .replace("{{CHARTS}}", &charts_html)
        .replace("{{PAGE_INFO}}", &text_of(doc, "pageInfo"))
        .replace("{{ORDER_ROWS}}", &html_of(doc, "ordersTableBody"))
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <meta http-equiv="refresh" content="15" />
  <title>Canteen Admin</title>
  <style>
    :root {
      --bg: #f6f7fb;
      --ink: #1e293b;
      --muted: #94a3b8;
      --accent: #fc8019;
      --card: #ffffff;
    }

    body {
      margin: 0;
      background: var(--bg);
      color: var(--ink);
      font-family: "Inter", "Segoe UI", sans-serif;
      padding: 28px;
    }

    .stats {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(180px, 1fr));
      gap: 16px;
    }

    .card {
      background: var(--card);
      border-radius: 14px;
      padding: 18px;
      box-shadow: 0 8px 24px rgba(30, 41, 59, 0.06);
    }

    .card .label {
      font-size: 0.8rem;
      text-transform: uppercase;
      color: var(--muted);
    }

    .card .value {
      font-size: 1.6rem;
      font-weight: 700;
    }

    table {
      width: 100%;
      border-collapse: collapse;
    }

    td, th {
      padding: 10px;
      border-bottom: 1px solid #e2e8f0;
      text-align: left;
    }

    .muted, .admin-empty {
      color: var(--muted);
    }

    .order-item-chip {
      background: #fff3e8;
      border-radius: 6px;
      padding: 2px 6px;
      margin-right: 4px;
      font-size: 12px;
    }

    .chart ul {
      list-style: none;
      padding: 0;
    }

    .chart .bar {
      display: inline-block;
      height: 8px;
      margin: 0 8px;
      background: var(--accent);
      border-radius: 4px;
    }
  </style>
</head>
<body>
  <h1>Canteen Admin</h1>
  <p class="muted">Last refreshed {{UPDATED}}</p>

  <section class="stats">
    <div class="card"><span class="label">Total revenue</span><div class="value" id="statTotalRevenue">{{TOTAL_REVENUE}}</div><span class="muted" id="statTodaysRevenue">{{TODAYS_REVENUE}}</span></div>
    <div class="card"><span class="label">Total orders</span><div class="value" id="statTotalOrders">{{TOTAL_ORDERS}}</div><span class="muted" id="statTodaysOrders">{{TODAYS_ORDERS}}</span></div>
    <div class="card"><span class="label">Active orders</span><div class="value" id="statActiveOrders">{{ACTIVE_ORDERS}}</div></div>
    <div class="card"><span class="label">Users</span><div class="value" id="statTotalUsers">{{TOTAL_USERS}}</div><span class="muted" id="statNewUsers">{{NEW_USERS}}</span></div>
  </section>

  <section class="card">
    <h2>Charts</h2>
    {{CHARTS}}
  </section>

  <section class="card">
    <h2>Recent orders</h2>
    <table><tbody id="recentOrdersBody">{{RECENT_ORDERS}}</tbody></table>
  </section>

  <section class="card">
    <h2>Orders</h2>
    <table><tbody id="ordersTableBody">{{ORDER_ROWS}}</tbody></table>
    <p class="muted" id="pageInfo">{{PAGE_INFO}}</p>
  </section>
</body>
</html>
"#;
