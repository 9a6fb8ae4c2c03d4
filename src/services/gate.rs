/// Decides whether the pipeline moves on to the next stage.
pub trait StageGate {
    fn proceed(&mut self, stage: &str) -> bool;
}

/// Never stops the pipeline.
#[derive(Debug, Default, Clone, Copy)]
pub struct BatchGate;

impl StageGate for BatchGate {
    fn proceed(&mut self, _stage: &str) -> bool {
        true
    }
}

impl<F> StageGate for F
where
    F: FnMut(&str) -> bool,
{
    fn proceed(&mut self, stage: &str) -> bool {
        self(stage)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_closure_gate_sees_every_stage() {
        let mut seen = Vec::new();
        let mut gate = |stage: &str| {
            seen.push(stage.to_string());
            stage != "stop"
        };
        assert!(gate.proceed("load"));
        assert!(!gate.proceed("stop"));
        assert_eq!(seen, vec!["load", "stop"]);
        assert!(BatchGate.proceed("anything"));
    }
}
