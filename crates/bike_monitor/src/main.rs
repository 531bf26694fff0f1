//! # Bike Monitor
//!
//! Monitor antifurto para bicicleta: lê o MPU6050, soa o buzzer quando o
//! servidor arma o dispositivo (LOCK) e envia acelerômetro + posição GPS
//! ao servidor periodicamente.
//!
//! ## Uso
//! ```bash
//! bike_monitor                 # Normal
//! RUST_LOG=debug bike_monitor  # Com NMEA bruto e detalhes do uplink
//! ```

mod hardware;

use bike_core::alarm::{AlarmMachine, Buzzer};
use bike_core::config::AppConfig;
use bike_core::http::TcpHttpClient;
use bike_core::uplink::UplinkClient;
use bike_core::{AlarmThreshold, DeviceMode, Monitor};
use embedded_hal::digital::OutputPin;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};

fn main() -> ExitCode {
    // ── Logging ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // ── Carregar config ──
    let config_path = AppConfig::default_path();
    let config = AppConfig::load(&config_path);

    // Salva config padrão se não existir
    if !config_path.exists() {
        if let Err(e) = config.save(&config_path) {
            warn!("Não foi possível salvar config padrão: {e}");
        }
    }

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            error!("Config inválida: {e}");
        }
        return ExitCode::FAILURE;
    }

    // ── Acelerômetro ──
    let mut sampler = match hardware::open_accelerometer(&config.hardware) {
        Ok(s) => s,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    match sampler.probe().and_then(|_| sampler.initialize()) {
        Ok(()) => {}
        Err(e) if config.control.accelerometer_required => {
            error!("✗ {e}. Verifique a fiação.");
            return ExitCode::FAILURE;
        }
        Err(e) => {
            error!("✗ {e}. Verifique a fiação.");
            warn!("Continuando sem acelerômetro: cada tick será pulado até o sensor responder");
        }
    }

    // ── Buzzer ──
    let mut buzzer = match hardware::open_buzzer_pin(&config.hardware) {
        Ok(pin) => Buzzer::new(pin),
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    if config.alarm.self_test {
        self_test(&mut buzzer);
    }

    // ── GPS ──
    let gps = match hardware::SerialGps::open(&config.hardware) {
        Ok(gps) => Some(gps),
        Err(e) => {
            warn!("{e}. Seguindo sem GPS (envios sem coordenada)");
            None
        }
    };

    // ── Uplink ──
    let transport = TcpHttpClient::new(
        config.server.host.clone(),
        config.server.port,
        config.server.path.clone(),
        config.server.timeout(),
    );

    // ── Banner ──
    let threshold = AlarmThreshold::new(config.alarm.default_threshold).unwrap_or_default();
    println!();
    println!("══════════════════════════════════════════════");
    println!("   🚴 MONITOR ANTIFURTO – ATIVO (Rust)");
    println!("══════════════════════════════════════════════");
    println!("  Servidor:     {}", config.server_url());
    println!("  Modo inicial: {}", DeviceMode::default());
    println!("  Threshold:    {threshold}");
    println!("  Tick:         {:.1}s", config.control.tick_interval_secs);
    println!("══════════════════════════════════════════════");
    println!();

    // ── Loop principal ──
    let mut monitor = Monitor::new(
        sampler,
        AlarmMachine::new(buzzer),
        gps,
        UplinkClient::new(transport),
        &config,
    );
    monitor.run()
}

/// Dois bipes curtos para confirmar o buzzer na inicialização.
fn self_test<P: OutputPin>(buzzer: &mut Buzzer<P>) {
    info!("🔔 Testando buzzer...");
    let pattern = [
        (true, 500),
        (false, 300),
        (true, 500),
        (false, 0),
    ];
    for (on, ms) in pattern {
        if let Err(e) = buzzer.set(on) {
            warn!("✗ Teste do buzzer falhou: {e}");
            let _ = buzzer.set(false);
            return;
        }
        std::thread::sleep(Duration::from_millis(ms));
    }
    info!("✓ Teste do buzzer concluído");
}
