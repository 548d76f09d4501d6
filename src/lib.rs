pub mod dsp;
pub mod engine;
pub mod error;
pub mod graph;
pub mod looper;
pub mod percussion;
pub mod repeater;
pub mod settings;
pub mod synth;
pub mod timer;

pub use engine::{UiEvent, Workstation, WorkstationStatus};
pub use error::WorkstationError;
pub use percussion::PercussionKind;
pub use settings::{SettingsUpdate, SoundMode, SynthesisSettings, WorkstationConfig};

use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the keystation-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("{e}"))
}

/// WASM-exposed workstation. The host calls `render` from its audio
/// callback and forwards UI actions to the other methods.
#[wasm_bindgen]
pub struct WasmWorkstation {
    inner: Workstation,
}

#[wasm_bindgen]
impl WasmWorkstation {
    /// Build from a camelCase JSON config; an empty string uses the defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<WasmWorkstation, JsValue> {
        let inner = if config_json.trim().is_empty() {
            Workstation::new(WorkstationConfig::default())
        } else {
            Workstation::from_json(config_json)
        }
        .map_err(js_err)?;
        Ok(WasmWorkstation { inner })
    }

    #[wasm_bindgen(js_name = noteOn)]
    pub fn note_on(&mut self, note_id: &str, frequency: f64) -> Result<(), JsValue> {
        self.inner.note_on(note_id, frequency).map(|_| ()).map_err(js_err)
    }

    #[wasm_bindgen(js_name = noteOff)]
    pub fn note_off(&mut self, note_id: &str) -> bool {
        self.inner.note_off(note_id)
    }

    #[wasm_bindgen(js_name = stopAll)]
    pub fn stop_all(&mut self) -> usize {
        self.inner.stop_all()
    }

    #[wasm_bindgen(js_name = emergencyStop)]
    pub fn emergency_stop(&mut self) -> usize {
        self.inner.emergency_stop()
    }

    #[wasm_bindgen(js_name = playPercussion)]
    pub fn play_percussion(&mut self, name: &str) -> Result<bool, JsValue> {
        self.inner.play_percussion_named(name).map_err(js_err)
    }

    /// Accepts a partial settings object; fields left out keep their current
    /// value. The applied settings are returned.
    #[wasm_bindgen(js_name = updateSettings)]
    pub fn update_settings(&mut self, update: JsValue) -> Result<JsValue, JsValue> {
        let update: SettingsUpdate = serde_wasm_bindgen::from_value(update).map_err(js_err)?;
        let applied = self.inner.apply_settings_update(&update);
        serde_wasm_bindgen::to_value(applied).map_err(js_err)
    }

    #[wasm_bindgen(js_name = setOscillatorWaveform)]
    pub fn set_oscillator_waveform(&mut self, name: &str) -> Result<(), JsValue> {
        self.inner.set_oscillator_waveform_named(name).map_err(js_err)
    }

    #[wasm_bindgen(js_name = setSoundMode)]
    pub fn set_sound_mode(&mut self, name: &str) -> Result<(), JsValue> {
        self.inner.set_sound_mode_named(name).map_err(js_err)
    }

    #[wasm_bindgen(js_name = toggleRepeater)]
    pub fn toggle_repeater(&mut self) -> bool {
        self.inner.toggle_repeater()
    }

    #[wasm_bindgen(js_name = setRepeaterInterval)]
    pub fn set_repeater_interval(&mut self, ms: f64) {
        self.inner.set_repeater_interval(ms);
    }

    #[wasm_bindgen(js_name = startRecording)]
    pub fn start_recording(&mut self) -> Result<(), JsValue> {
        self.inner.start_recording().map_err(js_err)
    }

    /// Returns the loop duration in seconds.
    #[wasm_bindgen(js_name = stopRecording)]
    pub fn stop_recording(&mut self) -> Result<f64, JsValue> {
        self.inner.stop_recording().map_err(js_err)
    }

    #[wasm_bindgen(js_name = playLoop)]
    pub fn play_loop(&mut self) -> Result<(), JsValue> {
        self.inner.play_loop().map_err(js_err)
    }

    #[wasm_bindgen(js_name = stopLoop)]
    pub fn stop_loop(&mut self) -> bool {
        self.inner.stop_loop()
    }

    /// Load a WAV file as the loop buffer; returns its duration in seconds.
    #[wasm_bindgen(js_name = importLoop)]
    pub fn import_loop(&mut self, bytes: &[u8]) -> Result<f64, JsValue> {
        self.inner.import_loop(bytes).map_err(js_err)
    }

    /// Fill `out` with the next block of mono output.
    pub fn render(&mut self, out: &mut [f32]) {
        self.inner.render(out);
    }

    pub fn status(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.inner.status()).map_err(js_err)
    }

    #[wasm_bindgen(js_name = drainUiEvents)]
    pub fn drain_ui_events(&mut self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.inner.drain_ui_events()).map_err(js_err)
    }
}
