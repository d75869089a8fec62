//! Reflectance sensor array for the Line-Follower Bot.
//!
//! `SensorArray` is what the control loop consumes: a calibration hook and a
//! reading with per-sensor intensities plus an estimated line position.
//! `CalibratedArray` implements it on top of any raw `ReflectanceSource` by
//! learning each sensor's min/max during the calibration sweep and
//! normalizing readings to 0..=1000 (1000 = darkest).

/// Number of reflectance sensors on the bot's array.
pub const SENSOR_COUNT: usize = 6;

/// Largest array `CalibratedArray` accepts: its edge position,
/// `(N - 1) * 1000`, must fit a `u16`. The weighted sum then stays below
/// `1000 * 1000 * N * (N - 1) / 2`, well inside a `u32`.
pub const MAX_SENSORS: usize = 66;

/// Position units between two neighbouring sensors.
const SENSOR_PITCH: u32 = 1000;
/// Full scale of a calibrated reading.
const CALIBRATED_MAX: u32 = 1000;
/// Raw samples taken by one `calibrate()` call.
const CALIBRATION_SAMPLES: usize = 10;
/// A calibrated value above this marks the line as seen.
const LINE_SEEN_LEVEL: u16 = 200;
/// Calibrated values at or below this are ignored by the position average.
const NOISE_LEVEL: u16 = 50;

/// One cycle's view of the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorReading<const N: usize> {
    /// Per-sensor intensity, index 0 = leftmost sensor.
    pub values: [u16; N],
    /// Estimated line position in `[0, position_max]`.
    pub position: u16,
}

impl<const N: usize> SensorReading<N> {
    pub fn new(
        values: [u16; N],
        position: u16,
    ) -> Self {
        Self { values, position }
    }
}

/// Capability the control loop needs from the sensor hardware.
pub trait SensorArray<const N: usize> {
    type Error: core::fmt::Debug;

    /// Bring the sensors up. Called once before calibration.
    fn init(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Take one calibration pass. Called repeatedly while the line is swept
    /// under the array.
    fn calibrate(&mut self) -> Result<(), Self::Error>;

    /// Read calibrated intensities and the line position.
    fn read(&mut self) -> Result<SensorReading<N>, Self::Error>;

    /// Position reported when the line is under the last sensor.
    fn position_max(&self) -> u16 {
        ((N.saturating_sub(1)) as u32 * SENSOR_PITCH) as u16
    }
}

/// Raw, uncalibrated reflectance readings.
///
/// Larger values mean less reflected light (darker surface).
pub trait ReflectanceSource<const N: usize> {
    type Error: core::fmt::Debug;

    fn read_raw(&mut self) -> Result<[u16; N], Self::Error>;
}

/// Min/max calibrating sensor array with weighted-average line position.
pub struct CalibratedArray<S, const N: usize> {
    source: S,
    /// Per-sensor `(min, max)` once at least one calibration pass has run.
    calibration: Option<([u16; N], [u16; N])>,
    /// Last position computed while the line was seen.
    last_position: u16,
}

impl<S, const N: usize> CalibratedArray<S, N>
where
    S: ReflectanceSource<N>,
{
    pub fn new(source: S) -> Self {
        const { assert!(N >= 1 && N <= MAX_SENSORS, "sensor count out of range") };
        Self {
            source,
            calibration: None,
            last_position: 0,
        }
    }

    /// Learned `(min, max)` per sensor, if calibrated.
    pub fn calibration(&self) -> Option<&([u16; N], [u16; N])> {
        self.calibration.as_ref()
    }

    /// Give back the raw source.
    pub fn release(self) -> S {
        self.source
    }

    /// Read raw values and scale them to 0..=1000 using the learned range.
    ///
    /// Before any calibration the raw values are returned as-is.
    pub fn read_calibrated(&mut self) -> Result<[u16; N], S::Error> {
        let raw = self.source.read_raw()?;
        let Some((min, max)) = &self.calibration else {
            return Ok(raw);
        };

        let mut out = [0u16; N];
        for (i, value) in out.iter_mut().enumerate() {
            let span = u32::from(max[i].saturating_sub(min[i]));
            *value = if span == 0 {
                0
            } else {
                let above = u32::from(raw[i].saturating_sub(min[i]));
                (above * CALIBRATED_MAX / span).min(CALIBRATED_MAX) as u16
            };
        }
        Ok(out)
    }

    /// Weighted average of sensor indices, scaled by `SENSOR_PITCH`.
    ///
    /// When no sensor sees the line, reports the edge of the array on the
    /// side where the line was last seen.
    fn line_position(
        &mut self,
        values: &[u16; N],
    ) -> u16 {
        let mut on_line = false;
        let mut weighted: u32 = 0;
        let mut total: u32 = 0;

        for (i, &v) in values.iter().enumerate() {
            if v > LINE_SEEN_LEVEL {
                on_line = true;
            }
            if v > NOISE_LEVEL {
                weighted += u32::from(v) * i as u32 * SENSOR_PITCH;
                total += u32::from(v);
            }
        }

        if !on_line {
            let edge = self.position_max();
            return if self.last_position < edge / 2 { 0 } else { edge };
        }

        self.last_position = (weighted / total) as u16;
        self.last_position
    }
}

impl<S, const N: usize> SensorArray<N> for CalibratedArray<S, N>
where
    S: ReflectanceSource<N>,
{
    type Error = S::Error;

    fn calibrate(&mut self) -> Result<(), Self::Error> {
        let mut sample_max = [0u16; N];
        let mut sample_min = [u16::MAX; N];

        for _ in 0..CALIBRATION_SAMPLES {
            let raw = self.source.read_raw()?;
            for i in 0..N {
                sample_max[i] = sample_max[i].max(raw[i]);
                sample_min[i] = sample_min[i].min(raw[i]);
            }
        }

        // Only widen the range by values seen on every sample, so a single
        // spike cannot stretch it.
        let (min, max) = self
            .calibration
            .get_or_insert(([u16::MAX; N], [0u16; N]));
        for i in 0..N {
            if sample_min[i] > max[i] {
                max[i] = sample_min[i];
            }
            if sample_max[i] < min[i] {
                min[i] = sample_max[i];
            }
        }
        Ok(())
    }

    fn read(&mut self) -> Result<SensorReading<N>, Self::Error> {
        let values = self.read_calibrated()?;
        let position = self.line_position(&values);
        Ok(SensorReading { values, position })
    }
}
