//! Dependency-ordered deletion of an app.
//!
//! The platform does not cascade app deletions, and service deletions
//! are asynchronous. Before the app itself is deleted, its services are
//! listed and deleted repeatedly, with a fixed pause between listings,
//! until a listing comes back empty. There is no upper bound on the
//! number of polls; cancellation is the only way out besides success or
//! an error.

use std::thread;

use crate::api::model::ListOptions;
use crate::error::{ProviderError, ProviderResult};
use crate::resource::Context;

/// Services fetched per listing.
pub const PAGE_SIZE: u32 = 100;

/// What draining an app took.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Number of service listings made, including the final empty one.
    pub polls: u32,
    /// Delete calls issued for services.
    pub deletes_issued: u32,
    /// Services skipped because they were already deleting or deleted.
    pub skipped: u32,
}

/// Delete every service of `app_id` and wait until none is listed.
///
/// A service that vanishes between the listing and its delete call
/// counts as deleted. Any other failure aborts the drain with
/// [`ProviderError::PartialDeletion`]; services deleted so far stay
/// deleted and the app is left in place.
pub fn drain_services(ctx: &Context<'_>, app_id: &str) -> ProviderResult<DrainReport> {
    let mut report = DrainReport::default();

    loop {
        ctx.checkpoint("listing services")?;
        let page = ctx
            .api
            .list_services(Some(app_id), &ListOptions::limit(PAGE_SIZE))?;
        report.polls += 1;

        if page.count == 0 {
            break;
        }

        tracing::debug!(app_id, remaining = page.count, "services still attached");

        for svc in &page.services {
            let service_id = svc.id.as_deref().unwrap_or_default();
            let status = svc.status.unwrap_or_default();
            if status.is_terminal() {
                report.skipped += 1;
                continue;
            }

            ctx.checkpoint("deleting services")?;
            tracing::info!(app_id, service_id, status = status.as_str(), "deleting service");
            report.deletes_issued += 1;
            match ctx.api.delete_service(service_id) {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {
                    tracing::debug!(service_id, "service already gone");
                }
                Err(e) => {
                    return Err(ProviderError::PartialDeletion {
                        app_id: app_id.to_string(),
                        service_id: service_id.to_string(),
                        source: Box::new(e),
                    });
                }
            }
        }

        thread::sleep(ctx.poll_interval);
    }

    Ok(report)
}

/// Drain the services of `app_id`, then delete the app.
///
/// The app delete is not confirmed with a follow-up read: a 2xx or a
/// 404 from the delete call completes the operation.
pub fn delete_app(ctx: &Context<'_>, app_id: &str) -> ProviderResult<DrainReport> {
    let report = drain_services(ctx, app_id)?;

    ctx.checkpoint("deleting app")?;
    match ctx.api.delete_app(app_id) {
        Ok(()) => tracing::info!(app_id, polls = report.polls, "app deleted"),
        Err(e) if e.is_not_found() => tracing::info!(app_id, "app already gone"),
        Err(e) => return Err(e),
    }

    Ok(report)
}
