//! Amostrador de movimento – driver mínimo do MPU-6050 via I2C.
//!
//! Genérico sobre [`embedded_hal::i2c::I2c`]; não faz retry. Uma falha de
//! leitura sobe como [`SensorError`] e o loop de controle pula o tick.

use crate::types::AccelerationSample;
use embedded_hal::i2c::{Error as _, I2c};
use tracing::{debug, info};

/// Endereço I2C padrão (AD0 em nível baixo).
pub const MPU6050_ADDR: u8 = 0x68;

/// Registradores usados.
pub mod registers {
    pub const PWR_MGMT_1: u8 = 0x6B;
    pub const ACCEL_XOUT_H: u8 = 0x3B;
    pub const ACCEL_YOUT_H: u8 = 0x3D;
    pub const ACCEL_ZOUT_H: u8 = 0x3F;
}

/// LSB por g na escala ±2g.
pub const LSB_PER_G: f64 = 16384.0;

/// Erros de sensores (acelerômetro, GPS, buzzer).
#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("Erro no barramento I2C ({op}): {kind:?}")]
    Bus {
        op: &'static str,
        kind: embedded_hal::i2c::ErrorKind,
    },

    #[error("Acelerômetro não detectado no endereço 0x{0:02X}")]
    NotDetected(u8),

    #[error("Erro de leitura do GPS: {0}")]
    Gps(String),

    #[error("Erro ao acionar o buzzer: {0}")]
    Buzzer(String),
}

/// Converte o par de registradores (big-endian, complemento de 2) em contagens.
pub fn decode_axis(high: u8, low: u8) -> i16 {
    let raw = (u16::from(high) << 8) | u16::from(low);
    if raw > 32767 {
        (i32::from(raw) - 65536) as i16
    } else {
        raw as i16
    }
}

/// Driver do acelerômetro.
pub struct MotionSampler<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> MotionSampler<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self::with_address(i2c, MPU6050_ADDR)
    }

    pub fn with_address(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Verifica se o dispositivo responde (ACK) no endereço configurado.
    pub fn probe(&mut self) -> Result<(), SensorError> {
        let mut buf = [0u8; 1];
        self.i2c
            .read(self.address, &mut buf)
            .map_err(|_| SensorError::NotDetected(self.address))
    }

    /// Tira o sensor do modo sleep.
    pub fn initialize(&mut self) -> Result<(), SensorError> {
        self.i2c
            .write(self.address, &[registers::PWR_MGMT_1, 0x00])
            .map_err(|e| SensorError::Bus {
                op: "wake",
                kind: e.kind(),
            })?;
        info!("✓ MPU6050 inicializado (0x{:02X})", self.address);
        Ok(())
    }

    fn read_word(&mut self, reg: u8) -> Result<i16, SensorError> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(self.address, &[reg], &mut buf)
            .map_err(|e| SensorError::Bus {
                op: "read",
                kind: e.kind(),
            })?;
        Ok(decode_axis(buf[0], buf[1]))
    }

    /// Lê os três eixos e converte para g.
    pub fn read(&mut self) -> Result<AccelerationSample, SensorError> {
        let x = self.read_word(registers::ACCEL_XOUT_H)?;
        let y = self.read_word(registers::ACCEL_YOUT_H)?;
        let z = self.read_word(registers::ACCEL_ZOUT_H)?;
        debug!("MPU6050 raw: x={x} y={y} z={z}");

        Ok(AccelerationSample::new(
            f64::from(x) / LSB_PER_G,
            f64::from(y) / LSB_PER_G,
            f64::from(z) / LSB_PER_G,
        ))
    }

    pub fn release(self) -> I2C {
        self.i2c
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
