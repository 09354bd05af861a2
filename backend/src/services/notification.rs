//! Notification dispatch service
//!
//! Resolves who should hear about a stock take or transfer and hands the
//! rendered report to the mail client. Configuration arrives as an explicit
//! [`NotificationSettings`] value at construction. A mail failure is logged
//! and swallowed: it never fails the operation that triggered it.

use crate::error::AppResult;
use crate::external::{MailApiClient, OutboundEmail};
use shared::models::{StockLine, User};
use shared::notify::{stock_take_recipients, transfer_recipients, NotificationSettings};
use shared::report::{render_transfer_report, Report};

use super::user::UserService;

/// Notification service
#[derive(Clone)]
pub struct NotificationService {
    users: UserService,
    settings: NotificationSettings,
    mail: Option<MailApiClient>,
    currency_symbol: String,
}

impl NotificationService {
    /// Create a new NotificationService instance
    pub fn new(
        users: UserService,
        settings: NotificationSettings,
        mail: Option<MailApiClient>,
        currency_symbol: String,
    ) -> Self {
        Self {
            users,
            settings,
            mail,
            currency_symbol,
        }
    }

    /// Send the stock-take reports for one completed reconciliation.
    ///
    /// Returns the number of emails actually sent. Transport failures are
    /// logged per report and do not surface as errors; only the recipient
    /// lookup itself can fail.
    pub async fn dispatch_stock_take_reports(
        &self,
        requester: &User,
        reports: &[Report],
    ) -> AppResult<usize> {
        let administrators = self.users.list_administrators().await?;
        let recipients = stock_take_recipients(&administrators, requester, &self.settings);

        if recipients.is_empty() {
            tracing::info!(
                requester = %requester.username,
                "there are no recipients in the notification email list"
            );
            return Ok(0);
        }

        if !self.settings.enabled {
            tracing::info!(
                requester = %requester.username,
                ?recipients,
                "notifications are disabled; stock take reports were not sent"
            );
            return Ok(0);
        }

        let mut sent = 0;
        for report in reports {
            if self.send(report, &recipients).await {
                sent += 1;
            }
        }
        Ok(sent)
    }

    /// Send the notification for one warehouse transfer.
    pub async fn notify_transfer(
        &self,
        requester: &User,
        line: &StockLine,
        units: i64,
    ) -> AppResult<usize> {
        let administrators = self.users.list_administrators().await?;
        let recipients = transfer_recipients(&administrators, requester, &self.settings);

        if recipients.is_empty() {
            tracing::info!(
                requester = %requester.username,
                "there are no recipients in the notification email list"
            );
            return Ok(0);
        }

        let report = render_transfer_report(
            &requester.username,
            &requester.email,
            &line.sku,
            &line.description,
            units,
            line.xfer_price,
            line.updated_at,
            &self.currency_symbol,
        );

        if !self.settings.enabled {
            tracing::info!(
                requester = %requester.username,
                ?recipients,
                "notifications are disabled; transfer notification was not sent"
            );
            return Ok(0);
        }

        Ok(if self.send(&report, &recipients).await { 1 } else { 0 })
    }

    /// Hand one report to the mail transport. Returns whether it went out.
    async fn send(&self, report: &Report, recipients: &[String]) -> bool {
        let email = OutboundEmail {
            subject: report.subject.clone(),
            plaintext: report.plaintext.clone(),
            html: report.html.clone(),
            recipients: recipients.to_vec(),
        };

        match &self.mail {
            Some(client) => match client.send(&email).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::error!(
                        subject = %report.subject,
                        error = %e,
                        "an error occurred whilst attempting to send email"
                    );
                    false
                }
            },
            None => {
                tracing::warn!(
                    subject = %report.subject,
                    ?recipients,
                    "no mail client configured; email was not sent"
                );
                false
            }
        }
    }
}
