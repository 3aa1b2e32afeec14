use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::core::{ExtraPaymentSolveConfig, PlanMonth};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub addr: SocketAddr,
    /// Pins the first schedule month; `None` uses the month each request arrives in.
    pub start_month: Option<PlanMonth>,
    pub solver: ExtraPaymentSolveConfig,
}

impl AppConfig {
    pub fn start_month(&self) -> PlanMonth {
        self.start_month.unwrap_or_else(PlanMonth::current)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8080),
            start_month: None,
            solver: ExtraPaymentSolveConfig::default(),
        }
    }
}
