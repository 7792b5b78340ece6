/// Notification message templates
///
/// One variant per domain event. Each renders a fixed message shape, the
/// notification kind it is stored under, and the client path it links to.

use crate::models::notification::{NewNotification, NotificationKind};

/// A domain event worth telling someone about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationTemplate {
    /// Sent to the user who just joined a group
    WelcomeToGroup { group_id: i64, group_name: String },

    /// Sent to existing participants when someone joins
    MemberJoined {
        group_id: i64,
        group_name: String,
        member_name: String,
    },

    ExpenseAdded {
        group_id: i64,
        group_name: String,
        expense_id: i64,
        payer_name: String,
        description: String,
        amount_cents: i64,
    },

    /// Sent to whoever paid the expense when a debtor pays toward their share.
    /// `remaining_cents > 0` renders as a partial payment.
    PaymentMade {
        group_id: i64,
        group_name: String,
        expense_id: i64,
        debtor_name: String,
        amount_cents: i64,
        remaining_cents: i64,
    },

    BalanceChanged {
        group_id: i64,
        group_name: String,
        previous_cents: i64,
        new_cents: i64,
    },
}

impl NotificationTemplate {
    pub fn kind(&self) -> NotificationKind {
        match self {
            NotificationTemplate::WelcomeToGroup { .. }
            | NotificationTemplate::MemberJoined { .. } => NotificationKind::Invitation,
            NotificationTemplate::ExpenseAdded { .. } => NotificationKind::ExpenseAdded,
            NotificationTemplate::PaymentMade { .. } => NotificationKind::PaymentMade,
            NotificationTemplate::BalanceChanged { .. } => NotificationKind::BalanceChanged,
        }
    }

    pub fn message(&self) -> String {
        match self {
            NotificationTemplate::WelcomeToGroup { group_name, .. } => {
                format!("Te uniste al grupo \"{}\"", group_name)
            }
            NotificationTemplate::MemberJoined {
                group_name,
                member_name,
                ..
            } => format!("{} se unió al grupo \"{}\"", member_name, group_name),
            NotificationTemplate::ExpenseAdded {
                group_name,
                payer_name,
                description,
                amount_cents,
                ..
            } => format!(
                "{} agregó el gasto \"{}\" por {} en \"{}\"",
                payer_name,
                description,
                format_currency(*amount_cents),
                group_name
            ),
            NotificationTemplate::PaymentMade {
                group_name,
                debtor_name,
                amount_cents,
                remaining_cents,
                ..
            } => {
                if *remaining_cents > 0 {
                    format!(
                        "{} realizó un pago parcial de {} en \"{}\" (pendiente: {})",
                        debtor_name,
                        format_currency(*amount_cents),
                        group_name,
                        format_currency(*remaining_cents)
                    )
                } else {
                    format!(
                        "{} te pagó {} en \"{}\"",
                        debtor_name,
                        format_currency(*amount_cents),
                        group_name
                    )
                }
            }
            NotificationTemplate::BalanceChanged {
                group_name,
                previous_cents,
                new_cents,
                ..
            } => format!(
                "Tu saldo en \"{}\" cambió de {} a {}",
                group_name,
                format_currency(*previous_cents),
                format_currency(*new_cents)
            ),
        }
    }

    /// Client path for the notification, built from group and expense ids.
    pub fn link(&self) -> String {
        match self {
            NotificationTemplate::WelcomeToGroup { group_id, .. }
            | NotificationTemplate::MemberJoined { group_id, .. } => {
                format!("/groups/{}", group_id)
            }
            NotificationTemplate::ExpenseAdded {
                group_id,
                expense_id,
                ..
            }
            | NotificationTemplate::PaymentMade {
                group_id,
                expense_id,
                ..
            } => format!("/groups/{}/expenses/{}", group_id, expense_id),
            NotificationTemplate::BalanceChanged { group_id, .. } => {
                format!("/groups/{}/balances", group_id)
            }
        }
    }

    /// Renders the template as an insert for `user_id`.
    pub fn for_user(&self, user_id: i64) -> NewNotification {
        NewNotification {
            user_id,
            kind: self.kind(),
            message: self.message(),
            link: Some(self.link()),
        }
    }
}

/// Formats cents as a dollar amount with thousands separators: `$1,234.56`.
pub fn format_currency(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    let whole = (abs / 100).to_string();
    let fraction = abs % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    format!("{}${}.{:02}", sign, grouped, fraction)
}
