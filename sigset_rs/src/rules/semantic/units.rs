//! `suggestedMetric` and `fmt.unit` must agree.

use crate::rules::{
    LintContext, LintResult, Rule, RuleConfig, RuleOutput, Severity, SignalTarget, rule_meta,
};

const DISTANCE: &[&str] = &["km", "kilometers", "mi", "miles", "m", "meters"];
const SPEED: &[&str] = &["km/h", "kmh", "kph", "kilometersperhour", "mph", "milesperhour"];
const PRESSURE: &[&str] = &["kpa", "kilopascal", "psi", "bar", "pa", "pascal"];
const PERCENT: &[&str] = &["%", "percent"];
const VOLTAGE: &[&str] = &["v", "volts"];
const CURRENT: &[&str] = &["a", "amps", "amperes"];
const TEMPERATURE: &[&str] = &["c", "°c", "celsius", "f", "°f", "fahrenheit"];
const ENERGY: &[&str] = &["kwh", "kilowatthours", "wh"];
const POWER: &[&str] = &["kw", "kilowatts", "w", "watts"];

/// `(category, allowed units)` for a metric. Units compare case-insensitively.
pub fn allowed_units(metric: &str) -> Option<(&'static str, &'static [&'static str])> {
    let category = match metric {
        "odometer" | "distanceSinceDtcClear" | "distanceWithMil" | "electricRange" | "range" => {
            ("distance", DISTANCE)
        }
        "speed" | "vehicleSpeed" => ("speed", SPEED),
        "stateOfCharge" | "stateOfHealth" | "fuelTankLevel" | "throttlePosition" => {
            ("percentage", PERCENT)
        }
        "batteryVoltage" | "hvBatteryVoltage" | "starterBatteryVoltage" => ("voltage", VOLTAGE),
        "hvBatteryCurrent" => ("current", CURRENT),
        "ambientAirTemperature" | "cabinTemperature" | "engineCoolantTemperature"
        | "hvBatteryTemperature" => ("temperature", TEMPERATURE),
        "batteryEnergy" | "chargeEnergy" => ("energy", ENERGY),
        "chargingPower" | "power" => ("power", POWER),
        m if m.ends_with("TirePressure") => ("pressure", PRESSURE),
        _ => return None,
    };
    Some(category)
}

pub struct UnitMetricRule {
    config: RuleConfig,
}

impl Default for UnitMetricRule {
    fn default() -> Self {
        Self {
            config: RuleConfig::new(Severity::Warning),
        }
    }
}

impl Rule for UnitMetricRule {
    rule_meta!(
        "unit-metric",
        "Unit matches metric",
        "The unit of a signal fits its suggested metric",
        [Signal]
    );

    fn validate_signal(&self, _ctx: &LintContext<'_>, target: SignalTarget<'_, '_>) -> RuleOutput {
        let SignalTarget::Signal(view) = target else {
            return Ok(Vec::new());
        };
        let (Some(metric), Some(unit)) = (
            view.signal.suggested_metric.as_deref(),
            view.signal.fmt.unit.as_deref(),
        ) else {
            return Ok(Vec::new());
        };
        let Some((category, allowed)) = allowed_units(metric) else {
            return Ok(Vec::new());
        };
        let normalized = unit.trim().to_lowercase();
        if allowed.contains(&normalized.as_str()) {
            return Ok(Vec::new());
        }

        let node = view
            .fmt_node()
            .and_then(|fmt| fmt.get("unit"))
            .unwrap_or(view.node);
        // ambiguous which unit was meant: flag only
        Ok(vec![LintResult::for_rule(
            self,
            node,
            format!(
                "Unit '{unit}' does not fit metric '{metric}' (expected a {category} unit: {})",
                allowed.join(", ")
            ),
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_support::run_rule;

    fn doc(metric: &str, unit: &str) -> String {
        format!(
            r#"{{"commands": [{{"hdr": "7E0", "cmd": "0100", "signals": [
  {{"id": "X", "suggestedMetric": "{metric}", "fmt": {{"len": 16, "unit": "{unit}"}}}}
]}}]}}"#
        )
    }

    #[test]
    fn test_matching_units_pass() {
        for (metric, unit) in [
            ("odometer", "kilometers"),
            ("frontLeftTirePressure", "kPa"),
            ("stateOfCharge", "percent"),
            ("speed", "km/h"),
        ] {
            assert!(
                run_rule(Box::new(UnitMetricRule::default()), &doc(metric, unit)).is_empty(),
                "{metric} / {unit}"
            );
        }
    }

    #[test]
    fn test_mismatch_is_flag_only() {
        let text = doc("rearRightTirePressure", "celsius");
        let results = run_rule(Box::new(UnitMetricRule::default()), &text);
        assert_eq!(results.len(), 1);
        assert!(results[0].message.contains("pressure unit"));
        assert!(results[0].suggestion.is_none());
        assert_eq!(&text[results[0].node.offset..results[0].node.end()], "\"celsius\"");
    }

    #[test]
    fn test_unknown_metric_is_ignored() {
        assert!(run_rule(Box::new(UnitMetricRule::default()), &doc("wiperMode", "x")).is_empty());
    }
}
