//! Automatable parameters with a WebAudio-style event timeline.
//!
//! A parameter holds an intrinsic value plus a time-ordered list of
//! automation events. Ramps interpolate from the event that precedes them;
//! a ramp scheduled on an empty timeline is anchored at the parameter's
//! last rendered time and value. Once every event lies in the past the
//! timeline collapses back into the intrinsic value.

use crate::error::ParamError;

/// Which parameter of a node is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    Frequency,
    Gain,
    Q,
    Mix,
}

impl ParamKind {
    pub(crate) const COUNT: usize = 4;

    pub(crate) fn slot(self) -> usize {
        match self {
            ParamKind::Frequency => 0,
            ParamKind::Gain => 1,
            ParamKind::Q => 2,
            ParamKind::Mix => 3,
        }
    }
}

/// One scheduled change on a parameter timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AutomationEvent {
    SetValue { time: f64, value: f64 },
    LinearRamp { time: f64, value: f64 },
    ExponentialRamp { time: f64, value: f64 },
}

impl AutomationEvent {
    pub fn time(&self) -> f64 {
        match *self {
            AutomationEvent::SetValue { time, .. }
            | AutomationEvent::LinearRamp { time, .. }
            | AutomationEvent::ExponentialRamp { time, .. } => time,
        }
    }

    pub fn value(&self) -> f64 {
        match *self {
            AutomationEvent::SetValue { value, .. }
            | AutomationEvent::LinearRamp { value, .. }
            | AutomationEvent::ExponentialRamp { value, .. } => value,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AudioParam {
    kind: ParamKind,
    value: f64,
    events: Vec<AutomationEvent>,
    last_time: f64,
    last_value: f64,
}

impl AudioParam {
    pub fn new(kind: ParamKind, value: f64) -> Self {
        AudioParam {
            kind,
            value,
            events: Vec::new(),
            last_time: 0.0,
            last_value: value,
        }
    }

    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    /// The value produced by the most recent render step.
    pub fn value(&self) -> f64 {
        self.last_value
    }

    /// Pending automation, oldest first.
    pub fn events(&self) -> &[AutomationEvent] {
        &self.events
    }

    pub fn set_value_at_time(&mut self, value: f64, time: f64) -> Result<(), ParamError> {
        check_finite(value)?;
        self.insert(AutomationEvent::SetValue { time, value });
        Ok(())
    }

    pub fn linear_ramp_to_value_at_time(&mut self, value: f64, time: f64) -> Result<(), ParamError> {
        check_finite(value)?;
        self.anchor();
        self.insert(AutomationEvent::LinearRamp { time, value });
        Ok(())
    }

    /// Exponential ramps cannot reach or cross zero, so the target must be positive.
    pub fn exponential_ramp_to_value_at_time(
        &mut self,
        value: f64,
        time: f64,
    ) -> Result<(), ParamError> {
        check_finite(value)?;
        if value <= 0.0 {
            return Err(ParamError::NonPositiveExponentialTarget(value));
        }
        self.anchor();
        self.insert(AutomationEvent::ExponentialRamp { time, value });
        Ok(())
    }

    /// Drop every event scheduled at or after `time`.
    pub fn cancel_scheduled_values(&mut self, time: f64) {
        self.events.retain(|e| e.time() < time);
    }

    /// Discard all automation and jump to `value` right away.
    pub fn set_value_immediately(&mut self, value: f64) {
        let value = if value.is_finite() { value } else { 0.0 };
        self.events.clear();
        self.value = value;
        self.last_value = value;
    }

    /// Evaluate the timeline at `t` without mutating it.
    pub fn value_at(&self, t: f64) -> f64 {
        let idx = self.events.partition_point(|e| e.time() <= t);

        let Some(next) = self.events.get(idx) else {
            return self.events.last().map_or(self.value, AutomationEvent::value);
        };

        let (t0, v0) = match idx.checked_sub(1).map(|i| self.events[i]) {
            Some(prev) => (prev.time(), prev.value()),
            None => return self.value,
        };

        match *next {
            AutomationEvent::SetValue { .. } => v0,
            AutomationEvent::LinearRamp { time: t1, value: v1 } => {
                if t1 <= t0 {
                    return v1;
                }
                v0 + (v1 - v0) * ((t - t0) / (t1 - t0))
            }
            AutomationEvent::ExponentialRamp { time: t1, value: v1 } => {
                if t1 <= t0 {
                    return v1;
                }
                if v0 * v1 <= 0.0 {
                    // WebAudio holds the start value when the ramp is undefined
                    return v0;
                }
                v0 * (v1 / v0).powf((t - t0) / (t1 - t0))
            }
        }
    }

    /// Render step: evaluate at `t`, remember the result, prune spent events.
    pub(crate) fn advance(&mut self, t: f64) -> f64 {
        let value = self.value_at(t);
        self.last_time = t;
        self.last_value = value;

        let idx = self.events.partition_point(|e| e.time() <= t);
        if idx == self.events.len() {
            if let Some(last) = self.events.last() {
                self.value = last.value();
                self.events.clear();
            }
        } else if idx > 1 {
            self.events.drain(..idx - 1);
        }
        value
    }

    fn anchor(&mut self) {
        if self.events.is_empty() {
            self.events.push(AutomationEvent::SetValue {
                time: self.last_time,
                value: self.last_value,
            });
        }
    }

    fn insert(&mut self, event: AutomationEvent) {
        let idx = self.events.partition_point(|e| e.time() <= event.time());
        self.events.insert(idx, event);
    }
}

fn check_finite(value: f64) -> Result<(), ParamError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ParamError::NonFinite(value))
    }
}
