//! 告警消息模板
//!
//! Telegram Markdown 格式，模板由 tera 渲染；数字在渲染前格式化好。

use rust_decimal::{Decimal, RoundingStrategy};
use tellspike_errors::{AppError, AppResult};
use tera::{Context, Tera};

use crate::domain::{ChangePercent, MetricChange, NetworkId};

const SPIKE_ALERT: &str = "spike_alert.md";
const TEST_MESSAGE: &str = "test_message.md";

const SEPARATOR: &str = "━━━━━━━━━━━━━━━━━━━━━━━━";

const SPIKE_ALERT_TEMPLATE: &str = r#"
*SPIKE ALERT* {{ marker }}
{{ separator }}

*Network:* {{ network }}
*Metric:* {{ metric }}
{% if unbounded %}*Change:* {{ trend }} (*new activity*){% else %}*Change:* {{ trend }} by *{{ change }}%*{% endif %}

*Previous:* {{ previous }}
*Current:* {{ current }}

{{ separator }}
[View Dashboard]({{ dashboard_url }}/dashboard/alerts)
"#;

const TEST_MESSAGE_TEMPLATE: &str = r#"
*TellSpike Alert System*
{{ separator }}

Status: CONNECTED

Telegram notifications are working.

*Alert Triggers:*
{{ triggers }}

{{ separator }}
[Open Dashboard]({{ dashboard_url }}/dashboard)
"#;

/// 告警消息格式化器
pub struct AlertMessageFormatter {
    tera: Tera,
    dashboard_url: String,
}

impl AlertMessageFormatter {
    pub fn new(dashboard_base_url: &str) -> AppResult<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            (SPIKE_ALERT, SPIKE_ALERT_TEMPLATE),
            (TEST_MESSAGE, TEST_MESSAGE_TEMPLATE),
        ])
        .map_err(|e| AppError::internal(format!("Failed to load message templates: {}", e)))?;

        Ok(Self {
            tera,
            dashboard_url: dashboard_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// 突增告警消息
    pub fn format_alert(&self, change: &MetricChange) -> AppResult<String> {
        let direction = change.direction();
        let mut context = self.base_context();
        context.insert("marker", direction.marker());
        context.insert("trend", direction.trend());
        context.insert("network", &escape_markdown(&change.network().display_name()));
        context.insert("metric", &escape_markdown(&change.metric_name().display_name()));
        match change.change_percent() {
            ChangePercent::Unbounded => context.insert("unbounded", &true),
            ChangePercent::Bounded(percent) => {
                context.insert("unbounded", &false);
                context.insert("change", &format_percent(percent.abs()));
            }
        }
        context.insert("previous", &format_amount(change.previous_value()));
        context.insert("current", &format_amount(change.current_value()));

        self.render(SPIKE_ALERT, &context)
    }

    /// 连通性测试消息，列出监控的网络及各自阈值
    pub fn format_test_message(&self, triggers: &[(NetworkId, Decimal)]) -> AppResult<String> {
        let lines: Vec<String> = triggers
            .iter()
            .map(|(network, threshold)| {
                format!(
                    "  - {} metrics change >{}%",
                    escape_markdown(&network.display_name()),
                    threshold.normalize()
                )
            })
            .collect();

        let mut context = self.base_context();
        context.insert("triggers", &lines.join("\n"));
        self.render(TEST_MESSAGE, &context)
    }

    fn base_context(&self) -> Context {
        let mut context = Context::new();
        context.insert("separator", SEPARATOR);
        context.insert("dashboard_url", &self.dashboard_url);
        context
    }

    fn render(&self, template: &str, context: &Context) -> AppResult<String> {
        self.tera
            .render(template, context)
            .map(|text| text.trim().to_string())
            .map_err(|e| AppError::internal(format!("Failed to render template {}: {}", template, e)))
    }
}

/// 转义 Telegram Markdown 的标记字符，用于插入的名称
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// 一位小数
pub fn format_percent(value: Decimal) -> String {
    format!(
        "{:.1}",
        value.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
    )
}

/// 千分位加两位小数，如 `1,234,567.50`
pub fn format_amount(value: Decimal) -> String {
    let fixed = format!(
        "{:.2}",
        value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    );
    let (sign, unsigned) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed.as_str()),
    };
    let (integer, fraction) = unsigned.split_once('.').unwrap_or((unsigned, "00"));

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    format!("{}{}.{}", sign, grouped, fraction)
}
