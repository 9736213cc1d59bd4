//! Device sensors (rotation, location) that scenes may ask for.
//!
//! Every scene switch disables all sensors. The new scene re-enables the ones
//! it requested during assembly once it is published.

/// A hardware or simulated input device that can be switched on and off.
pub trait DeviceSensor {
    fn name(&self) -> &str;
    fn enable(&mut self, on: bool);
    fn is_enabled(&self) -> bool;
}

/// A sensor without hardware behind it. Only tracks its on/off state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimulatedSensor {
    name: String,
    enabled: bool,
}

impl SimulatedSensor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: false,
        }
    }
}

impl DeviceSensor for SimulatedSensor {
    fn name(&self) -> &str {
        &self.name
    }

    fn enable(&mut self, on: bool) {
        self.enabled = on;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// The sensors known to the process.
#[derive(Default)]
pub struct SensorSet {
    sensors: Vec<Box<dyn DeviceSensor>>,
}

impl SensorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, sensor: impl DeviceSensor + 'static) {
        self.sensors.push(Box::new(sensor));
    }

    pub fn get(&self, name: &str) -> Option<&dyn DeviceSensor> {
        self.sensors
            .iter()
            .find(|s| s.name() == name)
            .map(|s| s.as_ref())
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.get(name).is_some_and(|s| s.is_enabled())
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    pub fn disable_all(&mut self) {
        for sensor in &mut self.sensors {
            sensor.enable(false);
        }
    }

    /// Enable the named sensors. Unknown names are logged and skipped.
    pub fn enable_requested(&mut self, names: &[String]) {
        for name in names {
            match self.sensors.iter_mut().find(|s| s.name() == name) {
                Some(sensor) => sensor.enable(true),
                None => tracing::warn!("[scene] unknown sensor '{}' requested", name),
            }
        }
    }
}
