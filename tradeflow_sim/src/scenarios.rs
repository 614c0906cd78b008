//! Simulation scenarios for the route sequence engine.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// SEQ-001: Three-stop route run to completion
    FullRoute,

    /// SEQ-002: One-stop route must be refused before any frame
    SingleStop,

    /// SEQ-003: Teardown at ~40% of the first arc
    CancelMidArc,

    /// SEQ-004: Teardown while the camera is still flying in
    CancelDuringFlyIn,

    /// SEQ-005: Teardown during the dwell after the first arrival
    CancelDuringDwell,

    /// SEQ-006: Route over both poles
    PolarRoute,

    /// SEQ-007: Leg between exactly antipodal points
    AntipodalRoute,

    /// SEQ-008: Heavy frame-interval jitter
    FrameJitter,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::FullRoute,
            ScenarioId::SingleStop,
            ScenarioId::CancelMidArc,
            ScenarioId::CancelDuringFlyIn,
            ScenarioId::CancelDuringDwell,
            ScenarioId::PolarRoute,
            ScenarioId::AntipodalRoute,
            ScenarioId::FrameJitter,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::FullRoute => "full_route",
            ScenarioId::SingleStop => "single_stop",
            ScenarioId::CancelMidArc => "cancel_mid_arc",
            ScenarioId::CancelDuringFlyIn => "cancel_during_fly_in",
            ScenarioId::CancelDuringDwell => "cancel_during_dwell",
            ScenarioId::PolarRoute => "polar_route",
            ScenarioId::AntipodalRoute => "antipodal_route",
            ScenarioId::FrameJitter => "frame_jitter",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::FullRoute => "China -> USA -> Brazil: steps 0,1,2 and two baked trails",
            ScenarioId::SingleStop => "One stop: configuration error, no frames requested",
            ScenarioId::CancelMidArc => "Cancel at 40% of the first arc: buffer empty, step stays 0",
            ScenarioId::CancelDuringFlyIn => "Cancel before the first arrival: no step notifications",
            ScenarioId::CancelDuringDwell => "Cancel while dwelling: no further notifications",
            ScenarioId::PolarRoute => "Legs over both poles: finite camera and indicator frames",
            ScenarioId::AntipodalRoute => "Exactly antipodal leg: slerp fallback keeps the arc on the sphere",
            ScenarioId::FrameJitter => "±25% frame jitter: camera still rides the arc tip",
        }
    }

    /// Returns true if the scenario tears the run down part way.
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            ScenarioId::CancelMidArc | ScenarioId::CancelDuringFlyIn | ScenarioId::CancelDuringDwell
        )
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full_route" | "fullroute" | "seq-001" => Ok(ScenarioId::FullRoute),
            "single_stop" | "singlestop" | "seq-002" => Ok(ScenarioId::SingleStop),
            "cancel_mid_arc" | "cancelmidarc" | "seq-003" => Ok(ScenarioId::CancelMidArc),
            "cancel_during_fly_in" | "cancelduringflyin" | "seq-004" => {
                Ok(ScenarioId::CancelDuringFlyIn)
            }
            "cancel_during_dwell" | "cancelduringdwell" | "seq-005" => {
                Ok(ScenarioId::CancelDuringDwell)
            }
            "polar_route" | "polarroute" | "seq-006" => Ok(ScenarioId::PolarRoute),
            "antipodal_route" | "antipodalroute" | "seq-007" => Ok(ScenarioId::AntipodalRoute),
            "frame_jitter" | "framejitter" | "seq-008" => Ok(ScenarioId::FrameJitter),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
