//! Process-wide chart component registration.
//!
//! The renderer must know which scales and elements exist before the first
//! chart is drawn. Registration happens once per process; later calls are
//! no-ops.

use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::api::logs::log_info;

/// Building blocks a bar chart is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChartComponent {
    CategoryScale,
    LinearScale,
    BarElement,
    Title,
    Tooltip,
    Legend,
}

const BAR_CHART_COMPONENTS: [ChartComponent; 6] = [
    ChartComponent::CategoryScale,
    ChartComponent::LinearScale,
    ChartComponent::BarElement,
    ChartComponent::Title,
    ChartComponent::Tooltip,
    ChartComponent::Legend,
];

static REGISTERED: OnceCell<Vec<ChartComponent>> = OnceCell::new();

/// Register the bar-chart components.
///
/// Returns `true` only for the call that performed the registration.
pub fn ensure_registered() -> bool {
    register_into(&REGISTERED)
}

/// Components registered so far; empty before [`ensure_registered`].
pub fn registered_components() -> &'static [ChartComponent] {
    REGISTERED.get().map(Vec::as_slice).unwrap_or(&[])
}

fn register_into(cell: &OnceCell<Vec<ChartComponent>>) -> bool {
    let mut first = false;
    cell.get_or_init(|| {
        first = true;
        log_info(format!("Registered {} chart components", BAR_CHART_COMPONENTS.len()));
        BAR_CHART_COMPONENTS.to_vec()
    });
    first
}
