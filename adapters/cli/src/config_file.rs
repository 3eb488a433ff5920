//! TOML run configuration accepted through `--config`.

use std::{f32::consts::TAU, fs, path::Path, time::Duration};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use strider_core::{GaitConfig, Vec3};

/// Parsed contents of a run configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RunFile {
    #[serde(default)]
    gait: GaitTable,
    #[serde(default)]
    limbs: Vec<LimbEntry>,
}

/// Overrides for [`GaitConfig`]. Durations are expressed in seconds.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct GaitTable {
    max_simultaneous_steps: Option<u32>,
    min_time_between_steps: Option<f32>,
    step_distance_threshold: Option<f32>,
    step_duration: Option<f32>,
    lift_height: Option<f32>,
    overshoot_fraction: Option<f32>,
    ground_query_search_radius: Option<f32>,
    ground_clearance: Option<f32>,
    body_height_offset: Option<f32>,
    body_height_smoothing: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LimbEntry {
    home_offset: [f32; 3],
}

/// Reads and parses the run configuration stored at `path`.
pub(crate) fn load(path: &Path) -> Result<RunFile> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read run configuration at {}", path.display()))?;
    parse(&contents).with_context(|| format!("invalid run configuration in {}", path.display()))
}

fn parse(contents: &str) -> Result<RunFile> {
    toml::from_str(contents).context("failed to parse run configuration toml contents")
}

impl RunFile {
    /// Builds a validated gait configuration, falling back to defaults for omitted keys.
    pub(crate) fn gait_config(&self) -> Result<GaitConfig> {
        let table = &self.gait;
        let defaults = GaitConfig::default();
        let config = GaitConfig {
            max_simultaneous_steps: table
                .max_simultaneous_steps
                .unwrap_or(defaults.max_simultaneous_steps),
            min_time_between_steps: seconds(
                "min_time_between_steps",
                table.min_time_between_steps,
                defaults.min_time_between_steps,
            )?,
            step_distance_threshold: table
                .step_distance_threshold
                .unwrap_or(defaults.step_distance_threshold),
            step_duration: seconds("step_duration", table.step_duration, defaults.step_duration)?,
            lift_height: table.lift_height.unwrap_or(defaults.lift_height),
            overshoot_fraction: table
                .overshoot_fraction
                .unwrap_or(defaults.overshoot_fraction),
            ground_query_search_radius: table
                .ground_query_search_radius
                .unwrap_or(defaults.ground_query_search_radius),
            ground_clearance: table.ground_clearance.unwrap_or(defaults.ground_clearance),
            body_height_offset: table
                .body_height_offset
                .unwrap_or(defaults.body_height_offset),
            body_height_smoothing: seconds(
                "body_height_smoothing",
                table.body_height_smoothing,
                defaults.body_height_smoothing,
            )?,
        };

        config.validate().context("invalid [gait] table")?;
        Ok(config)
    }

    /// Body-relative home offsets for every limb.
    ///
    /// Explicit `[[limbs]]` entries win; otherwise `count` limbs are spread
    /// evenly on a horizontal circle of `radius` around the body.
    pub(crate) fn limb_offsets(&self, count: usize, radius: f32) -> Result<Vec<Vec3>> {
        if !self.limbs.is_empty() {
            return self
                .limbs
                .iter()
                .enumerate()
                .map(|(index, entry)| {
                    let offset = Vec3::from_array(entry.home_offset);
                    if !offset.is_finite() {
                        bail!("[[limbs]] entry {index} has a non-finite home_offset");
                    }
                    Ok(offset)
                })
                .collect();
        }

        if !radius.is_finite() || radius <= 0.0 {
            bail!("limb radius must be positive and finite (received {radius})");
        }
        Ok(radial_offsets(count, radius))
    }
}

fn seconds(field: &str, value: Option<f32>, default: Duration) -> Result<Duration> {
    let Some(value) = value else {
        return Ok(default);
    };
    Duration::try_from_secs_f32(value).with_context(|| {
        format!("[gait] {field} must be a finite, non-negative number of seconds (got {value})")
    })
}

fn radial_offsets(count: usize, radius: f32) -> Vec<Vec3> {
    (0..count)
        .map(|index| {
            let angle = TAU * (index as f32 + 0.5) / count as f32;
            Vec3::new(radius * angle.cos(), 0.0, radius * angle.sin())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let run = parse("").expect("empty file is valid");
        assert_eq!(run.gait_config().expect("defaults"), GaitConfig::default());
    }

    #[test]
    fn gait_table_overrides_defaults_in_seconds() {
        let run = parse(
            r#"
            [gait]
            max_simultaneous_steps = 3
            step_duration = 0.4
            min_time_between_steps = 0.0
            lift_height = 0.5
            "#,
        )
        .expect("valid file");

        let config = run.gait_config().expect("valid gait table");
        assert_eq!(config.max_simultaneous_steps, 3);
        assert_eq!(config.step_duration, Duration::from_secs_f32(0.4));
        assert_eq!(config.min_time_between_steps, Duration::ZERO);
        assert_eq!(config.lift_height, 0.5);
        assert_eq!(
            config.step_distance_threshold,
            GaitConfig::default().step_distance_threshold
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(parse("[gait]\nstride = 2.0\n").is_err());
        assert!(parse("speed = 2.0\n").is_err());
    }

    #[test]
    fn negative_durations_are_reported_by_field() {
        let run = parse("[gait]\nstep_duration = -0.25\n").expect("syntactically valid");
        let error = run.gait_config().expect_err("negative duration");
        assert!(format!("{error:#}").contains("step_duration"));
    }

    #[test]
    fn degenerate_values_fail_validation() {
        let run = parse("[gait]\nmax_simultaneous_steps = 0\n").expect("syntactically valid");
        let error = run.gait_config().expect_err("no step capacity");
        assert!(format!("{error:#}").contains("max_simultaneous_steps"));
    }

    #[test]
    fn explicit_limbs_override_radial_layout() {
        let run = parse(
            r#"
            [[limbs]]
            home_offset = [1.0, 0.0, 0.5]

            [[limbs]]
            home_offset = [-1.0, 0.0, 0.5]
            "#,
        )
        .expect("valid file");

        let offsets = run.limb_offsets(6, 1.0).expect("explicit offsets");
        assert_eq!(
            offsets,
            vec![Vec3::new(1.0, 0.0, 0.5), Vec3::new(-1.0, 0.0, 0.5)]
        );
    }

    #[test]
    fn radial_layout_spreads_limbs_on_a_circle() {
        let offsets = RunFile::default()
            .limb_offsets(4, 2.0)
            .expect("valid radius");
        assert_eq!(offsets.len(), 4);
        for offset in &offsets {
            assert!((offset.length() - 2.0).abs() < 1e-5);
            assert_eq!(offset.y, 0.0);
        }
        assert!(RunFile::default().limb_offsets(4, 0.0).is_err());
    }
}
