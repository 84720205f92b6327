//! Sample releases for a fresh database

use airship_core::{NewRelease, Screenshot};
use time::macros::date;
use tracing::{error, info};

use crate::error::RepositoryError;
use crate::repository::ReleaseRepository;

const PERFORMANCE_DOCS: &str = "# Performance Optimization Update

## Key Improvements

- Reduced latency by 40%
- Optimized memory usage
- Improved database query performance

## Technical Details

Our latest update brings significant performance enhancements across the platform:

### Backend Optimizations
- Implemented advanced caching strategies
- Optimized database queries and indexing
- Reduced API response times

### Frontend Improvements
- Enhanced component rendering
- Implemented lazy loading for better initial load times
- Optimized asset delivery

## Getting Started

To take advantage of these improvements, no additional configuration is required. \
The optimizations are automatically applied to all existing implementations.";

const ANALYTICS_DOCS: &str = "# Analytics Dashboard

## Features

- Real-time data visualization
- Custom report generation
- Advanced filtering options
- Export capabilities
- Customizable dashboards

## Key Benefits

- Get instant insights into your customer engagement
- Make data-driven decisions with confidence
- Track performance metrics in real-time
- Identify trends and patterns

## Implementation Guide

1. Navigate to the Analytics section
2. Choose from pre-built dashboard templates
3. Customize widgets and metrics
4. Set up automated reports

## Best Practices

- Start with key metrics that align with your goals
- Use filters to segment your data effectively
- Set up regular automated reports
- Review and adjust your dashboard periodically";

const MESSAGING_DOCS: &str = "# Multi-Channel Messaging

## New Capabilities

- Unified messaging interface
- Cross-channel coordination
- Smart channel selection
- Advanced scheduling options
- Message templating system

## Channel Support

- Email
- SMS
- Push Notifications
- In-App Messages
- Web Push

## Implementation Steps

1. Configure channel settings
2. Set up message templates
3. Define coordination rules
4. Test cross-channel scenarios

## Best Practices

- Use channel-specific formatting
- Coordinate timing across channels
- Respect user preferences
- Monitor engagement metrics
- Test thoroughly before deployment";

/// The fixed sample set inserted into an empty database.
pub fn sample_releases() -> Vec<NewRelease> {
    vec![
        NewRelease::new("Enhanced Performance Optimization", date!(2025 - 03 - 15))
            .with_description("Major improvements to system performance and resource utilization.")
            .with_documentation(PERFORMANCE_DOCS)
            .with_screenshot(Screenshot::external(
                "https://placehold.co/1200x675/png?text=Performance+Overview",
                "Latency before and after the update",
            )),
        NewRelease::new("New Analytics Dashboard", date!(2025 - 03 - 01))
            .with_description(
                "Introducing a powerful new analytics dashboard with real-time insights.",
            )
            .with_documentation(ANALYTICS_DOCS)
            .with_screenshot(Screenshot::external(
                "https://placehold.co/1200x675/png?text=Analytics+Dashboard",
                "Dashboard overview",
            ))
            .with_screenshot(Screenshot::external(
                "https://placehold.co/1200x675/png?text=Custom+Reports",
                "Custom report builder",
            )),
        NewRelease::new("Multi-Channel Messaging Update", date!(2025 - 02 - 15))
            .with_description(
                "Seamlessly coordinate messages across email, SMS, and push notifications.",
            )
            .with_documentation(MESSAGING_DOCS)
            .with_screenshot(Screenshot::external(
                "https://placehold.co/1200x675/png?text=Unified+Inbox",
                "Unified messaging interface",
            )),
    ]
}

/// Insert the sample releases when the database holds none.
///
/// Returns how many were inserted; zero when any release already exists.
/// A sample that fails to insert is logged and skipped.
pub async fn seed(repo: &ReleaseRepository) -> Result<usize, RepositoryError> {
    if repo.count().await? > 0 {
        info!("Releases already present, skipping sample data");
        return Ok(0);
    }

    let mut inserted = 0;
    for release in sample_releases() {
        let title = release.title.clone();
        match repo.create(release).await {
            Ok(id) => {
                info!(%id, %title, "Added sample release");
                inserted += 1;
            }
            Err(e) => error!(%title, error = %e, "Failed to add sample release"),
        }
    }

    Ok(inserted)
}
