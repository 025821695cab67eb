//! Per-metric reference evaluation.
//!
//! Each evaluator maps one reading plus age/gender to a score in `[0, 100]`
//! and the findings that justify it. Absent input yields [`Evaluation::absent`]:
//! no findings and a score that never lowers a category minimum.

use crate::types::{Finding, FindingKind, Gender, Metric, ReferenceRange, Severity};

/// Score reported for a metric with no input.
pub const ABSENT_SCORE: f64 = 100.0;

/// Age assumed when the profile omits it.
pub const DEFAULT_AGE: u32 = 35;

pub mod thresholds {
    pub const RHR_LOWER_BPM: f64 = 50.0;
    pub const RHR_ATHLETIC_BPM: f64 = 60.0;
    pub const RHR_UPPER_MALE_BPM: f64 = 85.0;
    pub const RHR_UPPER_FEMALE_BPM: f64 = 88.0;
    pub const RHR_BRADYCARDIA_BPM: f64 = 40.0;
    pub const RHR_TACHYCARDIA_BPM: f64 = 100.0;

    pub const SYSTOLIC_ELEVATED: f64 = 120.0;
    pub const SYSTOLIC_STAGE1: f64 = 130.0;
    pub const SYSTOLIC_STAGE2: f64 = 140.0;
    pub const SYSTOLIC_CRISIS: f64 = 180.0;
    pub const DIASTOLIC_STAGE1: f64 = 80.0;
    pub const DIASTOLIC_STAGE2: f64 = 90.0;
    pub const DIASTOLIC_CRISIS: f64 = 120.0;
    pub const SYSTOLIC_LOW: f64 = 90.0;
    pub const DIASTOLIC_LOW: f64 = 60.0;

    pub const SLEEP_DEPRIVATION_HOURS: f64 = 6.0;

    pub const STEPS_TARGET: f64 = 10_000.0;
    pub const STEPS_TARGET_50: f64 = 8_000.0;
    pub const STEPS_TARGET_65: f64 = 7_000.0;

    /// 150 weekly minutes of moderate activity, spread over seven days.
    pub const DAILY_EXERCISE_MINUTES: f64 = 150.0 / 7.0;

    pub const BMI_UNDERWEIGHT: f64 = 18.5;
    pub const BMI_SEVERELY_UNDERWEIGHT: f64 = 16.0;
    pub const BMI_OVERWEIGHT: f64 = 25.0;
    pub const BMI_OVERWEIGHT_65: f64 = 27.0;
    pub const BMI_OBESE: f64 = 30.0;
    pub const BMI_SEVERELY_OBESE: f64 = 40.0;

    pub const SODIUM_LIMIT_MG: f64 = 2_300.0;
    pub const SODIUM_EXCESS_MG: f64 = 3_500.0;
    pub const FIBER_MIN_G: f64 = 25.0;
    pub const SUGAR_LIMIT_G: f64 = 50.0;
    pub const SUGAR_EXCESS_G: f64 = 75.0;
    pub const WATER_MIN_LITERS: f64 = 1.5;
}

use thresholds::*;

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub score: f64,
    pub findings: Vec<Finding>,
}

impl Evaluation {
    pub fn absent() -> Self {
        Self {
            score: ABSENT_SCORE,
            findings: Vec::new(),
        }
    }

    pub fn is_absent(&self) -> bool {
        self.findings.is_empty()
    }

    fn single(score: f64, finding: Finding) -> Self {
        Self {
            score: score.clamp(0.0, 100.0),
            findings: vec![finding],
        }
    }

    /// Worst-case merge: the lowest score wins and all findings are kept.
    fn merge(parts: Vec<Evaluation>) -> Self {
        let mut merged = Evaluation::absent();
        for part in parts {
            if part.is_absent() {
                continue;
            }
            merged.score = merged.score.min(part.score);
            merged.findings.extend(part.findings);
        }
        merged
    }
}

fn finding(
    metric: Metric,
    kind: FindingKind,
    severity: Severity,
    description: impl Into<String>,
    value: f64,
    reference: ReferenceRange,
) -> Finding {
    Finding {
        metric,
        kind,
        severity,
        description: description.into(),
        value,
        reference,
    }
}

/// Factor in `(0.9, 1.0]` that shrinks the healthy resting-HR ceiling with age.
pub fn resting_hr_age_factor(age: u32) -> f64 {
    let years_past_30 = age.saturating_sub(30) as f64;
    1.0 - (years_past_30 * 0.002).min(0.1)
}

pub fn resting_hr_range(age: u32, gender: Gender) -> ReferenceRange {
    let base_upper = match gender {
        Gender::Female => RHR_UPPER_FEMALE_BPM,
        Gender::Male => RHR_UPPER_MALE_BPM,
        Gender::Other | Gender::Unspecified => (RHR_UPPER_MALE_BPM + RHR_UPPER_FEMALE_BPM) / 2.0,
    };
    ReferenceRange::new(
        RHR_LOWER_BPM,
        base_upper * resting_hr_age_factor(age),
        "bpm",
    )
}

pub fn resting_heart_rate(value: Option<f64>, age: u32, gender: Gender) -> Evaluation {
    let Some(bpm) = value else {
        return Evaluation::absent();
    };
    let range = resting_hr_range(age, gender);
    let (score, kind, severity, description) = if bpm < RHR_BRADYCARDIA_BPM {
        (
            45.0,
            FindingKind::Concerning,
            Severity::High,
            format!("Resting heart rate of {bpm:.0} bpm is well below the expected range"),
        )
    } else if bpm < range.low {
        (
            70.0,
            FindingKind::Warning,
            Severity::Moderate,
            format!("Resting heart rate of {bpm:.0} bpm is below the expected range"),
        )
    } else if bpm <= RHR_ATHLETIC_BPM {
        (
            100.0,
            FindingKind::Excellent,
            Severity::Low,
            format!("Resting heart rate of {bpm:.0} bpm indicates strong cardiovascular fitness"),
        )
    } else if bpm <= range.high {
        (
            85.0,
            FindingKind::Normal,
            Severity::Low,
            format!("Resting heart rate of {bpm:.0} bpm is within the healthy range"),
        )
    } else if bpm <= RHR_TACHYCARDIA_BPM {
        (
            65.0,
            FindingKind::Warning,
            Severity::Moderate,
            format!("Resting heart rate of {bpm:.0} bpm is elevated for your age"),
        )
    } else {
        (
            40.0,
            FindingKind::Concerning,
            Severity::High,
            format!("Resting heart rate of {bpm:.0} bpm is above 100 bpm"),
        )
    };
    Evaluation::single(
        score,
        finding(Metric::RestingHeartRate, kind, severity, description, bpm, range),
    )
}

/// Expected RMSSD (ms), declining by 0.4 ms per year past 25 with a 20 ms floor.
pub fn expected_hrv(age: u32) -> f64 {
    (50.0 - 0.4 * age.saturating_sub(25) as f64).max(20.0)
}

pub fn heart_rate_variability(value: Option<f64>, age: u32, gender: Gender) -> Evaluation {
    let Some(ms) = value else {
        return Evaluation::absent();
    };
    // Women show slightly lower RMSSD on average.
    let expected = match gender {
        Gender::Female => expected_hrv(age) * 0.95,
        _ => expected_hrv(age),
    };
    let range = ReferenceRange::new(expected, expected * 2.0, "ms");
    let (score, kind, severity, description) = if ms >= expected * 1.2 {
        (
            100.0,
            FindingKind::Excellent,
            Severity::Low,
            format!("HRV of {ms:.0} ms reflects good recovery capacity"),
        )
    } else if ms >= expected {
        (
            85.0,
            FindingKind::Normal,
            Severity::Low,
            format!("HRV of {ms:.0} ms is within the expected range"),
        )
    } else if ms >= expected * 0.7 {
        (
            65.0,
            FindingKind::Warning,
            Severity::Moderate,
            format!("HRV of {ms:.0} ms is below the expected {expected:.0} ms"),
        )
    } else {
        (
            45.0,
            FindingKind::Concerning,
            Severity::High,
            format!("HRV of {ms:.0} ms is substantially below the expected {expected:.0} ms"),
        )
    };
    Evaluation::single(
        score,
        finding(Metric::HeartRateVariability, kind, severity, description, ms, range),
    )
}

pub fn blood_pressure(systolic: Option<f64>, diastolic: Option<f64>, age: u32) -> Evaluation {
    if systolic.is_none() && diastolic.is_none() {
        return Evaluation::absent();
    }
    // Older adults get a 10 mmHg allowance before "elevated".
    let allowance = if age >= 65 { 10.0 } else { 0.0 };
    let sys = systolic.unwrap_or(0.0);
    let dia = diastolic.unwrap_or(0.0);
    let range = ReferenceRange::new(SYSTOLIC_LOW, SYSTOLIC_ELEVATED + allowance, "mmHg");
    let reading = match (systolic, diastolic) {
        (Some(s), Some(d)) => format!("{s:.0}/{d:.0} mmHg"),
        (Some(s), None) => format!("systolic {s:.0} mmHg"),
        (None, Some(d)) => format!("diastolic {d:.0} mmHg"),
        (None, None) => String::new(),
    };

    let (score, kind, severity, description) =
        if sys > SYSTOLIC_CRISIS || dia > DIASTOLIC_CRISIS {
            (
                20.0,
                FindingKind::Concerning,
                Severity::High,
                format!("Blood pressure {reading} is in the hypertensive crisis range"),
            )
        } else if sys >= SYSTOLIC_STAGE2 + allowance || dia >= DIASTOLIC_STAGE2 {
            (
                45.0,
                FindingKind::Concerning,
                Severity::High,
                format!("Blood pressure {reading} indicates stage 2 hypertension"),
            )
        } else if sys >= SYSTOLIC_STAGE1 + allowance || dia >= DIASTOLIC_STAGE1 {
            (
                65.0,
                FindingKind::Warning,
                Severity::Moderate,
                format!("Blood pressure {reading} indicates stage 1 hypertension"),
            )
        } else if (systolic.is_some() && sys < SYSTOLIC_LOW)
            || (diastolic.is_some() && dia < DIASTOLIC_LOW)
        {
            (
                65.0,
                FindingKind::Warning,
                Severity::Moderate,
                format!("Blood pressure {reading} is below the expected range"),
            )
        } else if sys >= SYSTOLIC_ELEVATED + allowance {
            (
                80.0,
                FindingKind::Warning,
                Severity::Low,
                format!("Blood pressure {reading} is elevated"),
            )
        } else {
            (
                95.0,
                FindingKind::Normal,
                Severity::Low,
                format!("Blood pressure {reading} is normal"),
            )
        };
    let value = systolic.or(diastolic).unwrap_or_default();
    Evaluation::single(
        score,
        finding(Metric::BloodPressure, kind, severity, description, value, range),
    )
}

pub fn sleep_duration_range(age: u32) -> ReferenceRange {
    match age {
        0..=17 => ReferenceRange::new(8.0, 10.0, "h"),
        18..=64 => ReferenceRange::new(7.0, 9.0, "h"),
        _ => ReferenceRange::new(7.0, 8.0, "h"),
    }
}

pub fn sleep_duration(value: Option<f64>, age: u32) -> Evaluation {
    let Some(hours) = value else {
        return Evaluation::absent();
    };
    let range = sleep_duration_range(age);
    let (score, kind, severity, description) = if hours < SLEEP_DEPRIVATION_HOURS {
        (
            50.0,
            FindingKind::Concerning,
            Severity::High,
            format!("{hours:.1} hours of sleep is below the 6 hour deprivation threshold"),
        )
    } else if hours < range.low {
        (
            70.0,
            FindingKind::Warning,
            Severity::Moderate,
            format!("{hours:.1} hours of sleep is short of the recommended {:.0} hours", range.low),
        )
    } else if hours <= range.high {
        (
            90.0,
            FindingKind::Normal,
            Severity::Low,
            format!("{hours:.1} hours of sleep meets the recommendation"),
        )
    } else if hours <= range.high + 1.0 {
        (
            80.0,
            FindingKind::Normal,
            Severity::Low,
            format!("{hours:.1} hours of sleep is slightly above the recommendation"),
        )
    } else {
        (
            70.0,
            FindingKind::Warning,
            Severity::Moderate,
            format!("{hours:.1} hours of sleep is well above the recommendation"),
        )
    };
    Evaluation::single(
        score,
        finding(Metric::SleepDuration, kind, severity, description, hours, range),
    )
}

pub fn sleep_efficiency(value: Option<f64>) -> Evaluation {
    let Some(pct) = value else {
        return Evaluation::absent();
    };
    let range = ReferenceRange::new(85.0, 100.0, "%");
    let (score, kind, severity, description) = if pct >= 90.0 {
        (
            100.0,
            FindingKind::Excellent,
            Severity::Low,
            format!("Sleep efficiency of {pct:.0}% is excellent"),
        )
    } else if pct >= 85.0 {
        (
            85.0,
            FindingKind::Normal,
            Severity::Low,
            format!("Sleep efficiency of {pct:.0}% is healthy"),
        )
    } else if pct >= 75.0 {
        (
            65.0,
            FindingKind::Warning,
            Severity::Moderate,
            format!("Sleep efficiency of {pct:.0}% suggests fragmented sleep"),
        )
    } else {
        (
            45.0,
            FindingKind::Concerning,
            Severity::High,
            format!("Sleep efficiency of {pct:.0}% indicates poor sleep quality"),
        )
    };
    Evaluation::single(
        score,
        finding(Metric::SleepEfficiency, kind, severity, description, pct, range),
    )
}

/// Healthy share of deep sleep, which tapers after 30.
pub fn deep_sleep_range(age: u32) -> ReferenceRange {
    let lower = (13.0 - 0.05 * age.saturating_sub(30) as f64).max(10.0);
    ReferenceRange::new(lower, 23.0, "%")
}

pub fn sleep_stages(deep_pct: Option<f64>, rem_pct: Option<f64>, age: u32) -> Evaluation {
    if deep_pct.is_none() && rem_pct.is_none() {
        return Evaluation::absent();
    }
    let deep_range = deep_sleep_range(age);
    let rem_range = ReferenceRange::new(18.0, 28.0, "%");
    let deep_ok = deep_pct.map(|v| deep_range.contains(v));
    let rem_ok = rem_pct.map(|v| rem_range.contains(v));
    let assessed = [deep_ok, rem_ok].iter().flatten().count();
    let out_of_range = [deep_ok, rem_ok]
        .iter()
        .flatten()
        .filter(|ok| !**ok)
        .count();

    let (score, kind, severity, description) = match out_of_range {
        0 => (
            90.0,
            FindingKind::Normal,
            Severity::Low,
            "Sleep stage distribution is balanced".to_string(),
        ),
        1 if assessed == 2 => (
            70.0,
            FindingKind::Warning,
            Severity::Moderate,
            "One sleep stage is outside its healthy share".to_string(),
        ),
        1 => (
            70.0,
            FindingKind::Warning,
            Severity::Moderate,
            "Measured sleep stage is outside its healthy share".to_string(),
        ),
        _ => (
            55.0,
            FindingKind::Concerning,
            Severity::Moderate,
            "Deep and REM sleep are both outside their healthy shares".to_string(),
        ),
    };
    let (value, reference) = match deep_pct {
        Some(deep) => (deep, deep_range),
        None => (rem_pct.unwrap_or_default(), rem_range),
    };
    Evaluation::single(
        score,
        finding(Metric::SleepStages, kind, severity, description, value, reference),
    )
}

pub fn step_target(age: u32) -> f64 {
    match age {
        0..=49 => STEPS_TARGET,
        50..=64 => STEPS_TARGET_50,
        _ => STEPS_TARGET_65,
    }
}

/// Shared banding for "fraction of daily target reached" metrics.
fn target_ratio_band(ratio: f64) -> (f64, FindingKind, Severity) {
    if ratio >= 1.2 {
        (100.0, FindingKind::Excellent, Severity::Low)
    } else if ratio >= 1.0 {
        (90.0, FindingKind::Normal, Severity::Low)
    } else if ratio >= 0.7 {
        (70.0, FindingKind::Warning, Severity::Moderate)
    } else {
        (50.0, FindingKind::Concerning, Severity::High)
    }
}

pub fn step_count(value: Option<f64>, age: u32) -> Evaluation {
    let Some(steps) = value else {
        return Evaluation::absent();
    };
    let target = step_target(age);
    let (score, kind, severity) = target_ratio_band(steps / target);
    let description = format!(
        "{steps:.0} steps is {:.0}% of the {target:.0} step target",
        steps / target * 100.0
    );
    Evaluation::single(
        score,
        finding(
            Metric::Steps,
            kind,
            severity,
            description,
            steps,
            ReferenceRange::new(target, target * 1.5, "steps"),
        ),
    )
}

pub fn exercise_minutes(value: Option<f64>, age: u32) -> Evaluation {
    let Some(minutes) = value else {
        return Evaluation::absent();
    };
    let target = DAILY_EXERCISE_MINUTES;
    let ratio = minutes / target;
    let (score, kind, severity) = if ratio >= 1.5 {
        (100.0, FindingKind::Excellent, Severity::Low)
    } else if ratio >= 1.0 {
        (90.0, FindingKind::Normal, Severity::Low)
    } else if ratio >= 0.5 {
        (70.0, FindingKind::Warning, Severity::Moderate)
    } else {
        (50.0, FindingKind::Concerning, Severity::High)
    };
    let mut description = format!("{minutes:.0} exercise minutes against a {target:.0} minute daily goal");
    if age >= 65 && kind != FindingKind::Excellent {
        description.push_str("; include balance work on active days");
    }
    Evaluation::single(
        score,
        finding(
            Metric::ExerciseMinutes,
            kind,
            severity,
            description,
            minutes,
            ReferenceRange::new(target, target * 3.0, "min"),
        ),
    )
}

pub fn active_calorie_target(age: u32, gender: Gender) -> f64 {
    let base = match gender {
        Gender::Male => 500.0,
        Gender::Female => 400.0,
        Gender::Other | Gender::Unspecified => 450.0,
    };
    if age >= 65 {
        base * 0.8
    } else {
        base
    }
}

pub fn caloric_expenditure(value: Option<f64>, age: u32, gender: Gender) -> Evaluation {
    let Some(kcal) = value else {
        return Evaluation::absent();
    };
    let target = active_calorie_target(age, gender);
    let (score, kind, severity) = target_ratio_band(kcal / target);
    Evaluation::single(
        score,
        finding(
            Metric::ActiveCalories,
            kind,
            severity,
            format!("{kcal:.0} active kcal against a {target:.0} kcal target"),
            kcal,
            ReferenceRange::new(target, target * 2.0, "kcal"),
        ),
    )
}

pub fn bmi(value: Option<f64>, age: u32) -> Evaluation {
    let Some(bmi) = value else {
        return Evaluation::absent();
    };
    let overweight = if age >= 65 {
        BMI_OVERWEIGHT_65
    } else {
        BMI_OVERWEIGHT
    };
    let range = ReferenceRange::new(BMI_UNDERWEIGHT, overweight, "kg/m2");
    let (score, kind, severity, description) = if bmi < BMI_SEVERELY_UNDERWEIGHT {
        (
            45.0,
            FindingKind::Concerning,
            Severity::High,
            format!("BMI of {bmi:.1} is severely underweight"),
        )
    } else if bmi < BMI_UNDERWEIGHT {
        (
            65.0,
            FindingKind::Warning,
            Severity::Moderate,
            format!("BMI of {bmi:.1} is underweight"),
        )
    } else if bmi < overweight {
        (
            95.0,
            FindingKind::Normal,
            Severity::Low,
            format!("BMI of {bmi:.1} is in the healthy range"),
        )
    } else if bmi < BMI_OBESE {
        (
            70.0,
            FindingKind::Warning,
            Severity::Moderate,
            format!("BMI of {bmi:.1} is in the overweight range"),
        )
    } else if bmi < BMI_SEVERELY_OBESE {
        (
            50.0,
            FindingKind::Concerning,
            Severity::High,
            format!("BMI of {bmi:.1} is in the obese range"),
        )
    } else {
        (
            30.0,
            FindingKind::Concerning,
            Severity::High,
            format!("BMI of {bmi:.1} is in the severely obese range"),
        )
    };
    Evaluation::single(
        score,
        finding(Metric::Bmi, kind, severity, description, bmi, range),
    )
}

pub fn body_fat_range(age: u32, gender: Gender) -> ReferenceRange {
    let (male, female) = match age {
        0..=39 => ((8.0, 20.0), (21.0, 33.0)),
        40..=59 => ((11.0, 22.0), (23.0, 34.0)),
        _ => ((13.0, 25.0), (24.0, 36.0)),
    };
    let (low, high) = match gender {
        Gender::Male => male,
        Gender::Female => female,
        Gender::Other | Gender::Unspecified => ((male.0 + female.0) / 2.0, (male.1 + female.1) / 2.0),
    };
    ReferenceRange::new(low, high, "%")
}

pub fn body_fat(value: Option<f64>, age: u32, gender: Gender) -> Evaluation {
    let Some(pct) = value else {
        return Evaluation::absent();
    };
    let range = body_fat_range(age, gender);
    let (score, kind, severity, description) = if pct < range.low - 4.0 {
        (
            50.0,
            FindingKind::Concerning,
            Severity::High,
            format!("Body fat of {pct:.1}% is far below the essential range"),
        )
    } else if pct < range.low {
        (
            70.0,
            FindingKind::Warning,
            Severity::Moderate,
            format!("Body fat of {pct:.1}% is below the healthy range"),
        )
    } else if pct <= range.high {
        (
            90.0,
            FindingKind::Normal,
            Severity::Low,
            format!("Body fat of {pct:.1}% is in the healthy range"),
        )
    } else if pct <= range.high + 5.0 {
        (
            65.0,
            FindingKind::Warning,
            Severity::Moderate,
            format!("Body fat of {pct:.1}% is above the healthy range"),
        )
    } else {
        (
            50.0,
            FindingKind::Concerning,
            Severity::High,
            format!("Body fat of {pct:.1}% is well above the healthy range"),
        )
    };
    Evaluation::single(
        score,
        finding(Metric::BodyFat, kind, severity, description, pct, range),
    )
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NutritionInput {
    pub sodium_mg: Option<f64>,
    pub fiber_g: Option<f64>,
    pub sugar_g: Option<f64>,
    pub water_liters: Option<f64>,
}

/// One finding per reported nutrient; the category score is the worst of them.
pub fn nutrition(input: NutritionInput) -> Evaluation {
    let mut parts = Vec::new();

    if let Some(sodium) = input.sodium_mg {
        let range = ReferenceRange::new(0.0, SODIUM_LIMIT_MG, "mg");
        let (score, kind, severity, description) = if sodium > SODIUM_EXCESS_MG {
            (
                50.0,
                FindingKind::Concerning,
                Severity::High,
                format!("Sodium intake of {sodium:.0} mg far exceeds the daily limit"),
            )
        } else if sodium > SODIUM_LIMIT_MG {
            (
                70.0,
                FindingKind::Warning,
                Severity::Moderate,
                format!("Sodium intake of {sodium:.0} mg exceeds the daily limit"),
            )
        } else {
            (
                90.0,
                FindingKind::Normal,
                Severity::Low,
                format!("Sodium intake of {sodium:.0} mg is within the daily limit"),
            )
        };
        parts.push(Evaluation::single(
            score,
            finding(Metric::Nutrition, kind, severity, description, sodium, range),
        ));
    }

    if let Some(fiber) = input.fiber_g {
        let range = ReferenceRange::new(FIBER_MIN_G, 40.0, "g");
        let (score, kind, severity) = if fiber >= FIBER_MIN_G {
            (90.0, FindingKind::Normal, Severity::Low)
        } else if fiber >= 15.0 {
            (75.0, FindingKind::Warning, Severity::Low)
        } else {
            (65.0, FindingKind::Warning, Severity::Moderate)
        };
        parts.push(Evaluation::single(
            score,
            finding(
                Metric::Nutrition,
                kind,
                severity,
                format!("Fiber intake of {fiber:.0} g against a {FIBER_MIN_G:.0} g goal"),
                fiber,
                range,
            ),
        ));
    }

    if let Some(sugar) = input.sugar_g {
        let range = ReferenceRange::new(0.0, SUGAR_LIMIT_G, "g");
        let (score, kind, severity) = if sugar > SUGAR_EXCESS_G {
            (55.0, FindingKind::Concerning, Severity::Moderate)
        } else if sugar > SUGAR_LIMIT_G {
            (70.0, FindingKind::Warning, Severity::Moderate)
        } else {
            (90.0, FindingKind::Normal, Severity::Low)
        };
        parts.push(Evaluation::single(
            score,
            finding(
                Metric::Nutrition,
                kind,
                severity,
                format!("Added sugar intake of {sugar:.0} g"),
                sugar,
                range,
            ),
        ));
    }

    if let Some(water) = input.water_liters {
        let range = ReferenceRange::new(WATER_MIN_LITERS, 3.5, "L");
        let (score, kind, severity) = if water >= WATER_MIN_LITERS {
            (90.0, FindingKind::Normal, Severity::Low)
        } else {
            (75.0, FindingKind::Warning, Severity::Low)
        };
        parts.push(Evaluation::single(
            score,
            finding(
                Metric::Nutrition,
                kind,
                severity,
                format!("Water intake of {water:.1} L"),
                water,
                range,
            ),
        ));
    }

    Evaluation::merge(parts)
}
