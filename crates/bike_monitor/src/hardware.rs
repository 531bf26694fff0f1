//! Ligação com o hardware Linux: I2C (MPU6050), GPIO (buzzer), UART (GPS).

use bike_core::config::HardwareConfig;
use bike_core::gps::GpsSource;
use bike_core::sampler::{MotionSampler, SensorError};
use linux_embedded_hal::gpio_cdev::{Chip, LineRequestFlags};
use linux_embedded_hal::{CdevPin, I2cdev};
use serialport::SerialPort;
use std::io::{BufRead, BufReader, ErrorKind};
use std::time::Duration;
use tracing::{debug, info};

/// Linhas NMEA têm no máximo 82 caracteres; acima disso é ruído.
const MAX_LINE_BYTES: usize = 256;

/// Abre o barramento I2C do acelerômetro.
pub fn open_accelerometer(cfg: &HardwareConfig) -> Result<MotionSampler<I2cdev>, String> {
    let i2c = I2cdev::new(&cfg.i2c_bus)
        .map_err(|e| format!("Falha ao abrir {}: {e}", cfg.i2c_bus))?;
    info!("I2C aberto em {}", cfg.i2c_bus);
    Ok(MotionSampler::with_address(i2c, cfg.mpu_address))
}

/// Requisita a linha GPIO do buzzer como saída, inicialmente desligada.
pub fn open_buzzer_pin(cfg: &HardwareConfig) -> Result<CdevPin, String> {
    let mut chip = Chip::new(&cfg.buzzer_chip)
        .map_err(|e| format!("Falha ao abrir {}: {e}", cfg.buzzer_chip))?;
    let handle = chip
        .get_line(cfg.buzzer_line)
        .and_then(|line| line.request(LineRequestFlags::OUTPUT, 0, "bike-buzzer"))
        .map_err(|e| format!("Falha ao requisitar GPIO {}: {e}", cfg.buzzer_line))?;
    CdevPin::new(handle).map_err(|e| format!("Falha ao configurar GPIO {}: {e}", cfg.buzzer_line))
}

/// Receptor GPS em porta serial, com leitura limitada pelo timeout da porta.
pub struct SerialGps {
    reader: BufReader<Box<dyn SerialPort>>,
    /// Bytes de uma linha ainda incompleta
    pending: Vec<u8>,
}

impl SerialGps {
    pub fn open(cfg: &HardwareConfig) -> Result<Self, String> {
        let port = serialport::new(&cfg.gps_port, cfg.gps_baud)
            .timeout(Duration::from_millis(cfg.gps_timeout_ms))
            .open()
            .map_err(|e| format!("Falha ao abrir {}: {e}", cfg.gps_port))?;
        info!("GPS em {} @ {} baud", cfg.gps_port, cfg.gps_baud);
        Ok(Self {
            reader: BufReader::new(port),
            pending: Vec::new(),
        })
    }
}

impl GpsSource for SerialGps {
    fn has_data(&mut self) -> Result<bool, SensorError> {
        if !self.reader.buffer().is_empty() || !self.pending.is_empty() {
            return Ok(true);
        }
        self.reader
            .get_ref()
            .bytes_to_read()
            .map(|n| n > 0)
            .map_err(|e| SensorError::Gps(e.to_string()))
    }

    fn read_line(&mut self) -> Result<Option<Vec<u8>>, SensorError> {
        match self.reader.read_until(b'\n', &mut self.pending) {
            Ok(_) if self.pending.ends_with(b"\n") => Ok(Some(std::mem::take(&mut self.pending))),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == ErrorKind::TimedOut => {
                // Linha incompleta fica para o próximo tick
                if self.pending.len() > MAX_LINE_BYTES {
                    debug!("Descartando {} bytes sem terminador", self.pending.len());
                    self.pending.clear();
                }
                Ok(None)
            }
            Err(e) => Err(SensorError::Gps(e.to_string())),
        }
    }
}
