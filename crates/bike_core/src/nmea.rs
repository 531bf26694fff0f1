//! Parser de sentenças NMEA 0183 → [`GeoCoordinate`].
//!
//! Só duas famílias interessam: GGA (fix) e RMC (mínimo recomendado).
//! Cada família tem sua tabela fixa de índices de campo:
//!
//! ```text
//! $GPGGA,hhmmss.ss,LLLL.LL,a,YYYYY.YY,a,...   lat=2 ns=3 lon=4 ew=5
//! $GPRMC,hhmmss.ss,A,LLLL.LL,a,YYYYY.YY,a,... lat=3 ns=4 lon=5 ew=6
//! ```
//!
//! Entrada malformada nunca gera erro: vira `None` ("sem fix neste tick").
//! Minutos ≥ 60 não são rejeitados.

use crate::types::GeoCoordinate;

/// Família da sentença, identificada pelo prefixo talker+tipo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentenceKind {
    /// `$GPGGA` / `$GNGGA`
    Fix,
    /// `$GPRMC` / `$GNRMC`
    RecommendedMinimum,
    Unrecognized,
}

/// Índices dos campos de posição dentro da sentença.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    pub lat: usize,
    pub lat_dir: usize,
    pub lon: usize,
    pub lon_dir: usize,
}

impl FieldLayout {
    /// Número mínimo de campos separados por vírgula.
    pub fn min_fields(&self) -> usize {
        self.lon_dir + 1
    }
}

const FIX_LAYOUT: FieldLayout = FieldLayout {
    lat: 2,
    lat_dir: 3,
    lon: 4,
    lon_dir: 5,
};

const RMC_LAYOUT: FieldLayout = FieldLayout {
    lat: 3,
    lat_dir: 4,
    lon: 5,
    lon_dir: 6,
};

/// Dígitos de graus inteiros: `DDMM.MMMM` e `DDDMM.MMMM`.
const LAT_DEGREE_DIGITS: usize = 2;
const LON_DEGREE_DIGITS: usize = 3;

impl SentenceKind {
    pub fn detect(line: &str) -> Self {
        const FIX_PREFIXES: [&str; 2] = ["$GPGGA", "$GNGGA"];
        const RMC_PREFIXES: [&str; 2] = ["$GPRMC", "$GNRMC"];

        if FIX_PREFIXES.iter().any(|p| line.starts_with(p)) {
            SentenceKind::Fix
        } else if RMC_PREFIXES.iter().any(|p| line.starts_with(p)) {
            SentenceKind::RecommendedMinimum
        } else {
            SentenceKind::Unrecognized
        }
    }

    pub fn layout(&self) -> Option<FieldLayout> {
        match self {
            SentenceKind::Fix => Some(FIX_LAYOUT),
            SentenceKind::RecommendedMinimum => Some(RMC_LAYOUT),
            SentenceKind::Unrecognized => None,
        }
    }
}

/// Extrai a coordenada de uma linha NMEA já sem terminadores.
pub fn parse_sentence(line: &str) -> Option<GeoCoordinate> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let layout = SentenceKind::detect(line).layout()?;
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() < layout.min_fields() {
        return None;
    }

    let latitude = nmea_to_decimal(
        fields[layout.lat],
        fields[layout.lat_dir],
        LAT_DEGREE_DIGITS,
    )?;
    let longitude = nmea_to_decimal(
        fields[layout.lon],
        fields[layout.lon_dir],
        LON_DEGREE_DIGITS,
    )?;

    Some(GeoCoordinate {
        latitude,
        longitude,
    })
}

/// Converte `graus+minutos` NMEA em graus decimais com sinal.
///
/// `degree_digits` é quantos caracteres iniciais são graus inteiros.
pub fn nmea_to_decimal(raw: &str, direction: &str, degree_digits: usize) -> Option<f64> {
    if raw.is_empty() {
        return None;
    }

    let degrees: f64 = raw.get(..degree_digits)?.parse().ok()?;
    let minutes: f64 = raw.get(degree_digits..)?.parse().ok()?;

    let mut decimal = degrees + minutes / 60.0;
    if matches!(direction, "S" | "W") {
        decimal = -decimal;
    }
    Some(round6(decimal))
}

fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const GGA: &str = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";
    const RMC: &str = "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A";

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-6, "{a} != {b}");
    }

    #[test]
    fn parses_gga_fix() {
        let c = parse_sentence(GGA).unwrap();
        assert_close(c.latitude, 48.117300);
        assert_close(c.longitude, 11.516667);
    }

    #[test]
    fn parses_rmc_with_shifted_fields() {
        let c = parse_sentence(RMC).unwrap();
        assert_close(c.latitude, 48.117300);
        assert_close(c.longitude, 11.516667);
    }

    #[test]
    fn gn_talker_is_accepted() {
        let line = GGA.replacen("$GPGGA", "$GNGGA", 1);
        assert!(parse_sentence(&line).is_some());
    }

    #[test]
    fn south_and_west_negate() {
        let line = "$GPGGA,123519,4807.038,S,01131.000,W,1,08,0.9,545.4,M,46.9,M,,*47";
        let c = parse_sentence(line).unwrap();
        assert_close(c.latitude, -48.117300);
        assert_close(c.longitude, -11.516667);
    }

    #[test]
    fn result_is_rounded_to_six_decimals() {
        let c = parse_sentence(GGA).unwrap();
        assert_eq!(c.longitude, 11.516667);
    }

    #[test]
    fn empty_and_unknown_lines_yield_none() {
        assert_eq!(parse_sentence(""), None);
        assert_eq!(parse_sentence("   "), None);
        assert_eq!(parse_sentence("$GPGSV,3,1,11,03,03,111,00*74"), None);
        assert_eq!(parse_sentence("garbage"), None);
    }

    #[test]
    fn too_few_fields_yield_none() {
        assert_eq!(parse_sentence("$GPGGA,123519,4807.038,N,01131.000"), None);
        assert_eq!(parse_sentence("$GPRMC,123519,A,4807.038,N,01131.000"), None);
    }

    #[test]
    fn empty_position_field_yields_none() {
        assert_eq!(parse_sentence("$GPGGA,123519,,N,01131.000,E,0"), None);
        assert_eq!(parse_sentence("$GPRMC,123519,V,,,,,,,230394,,*6A"), None);
    }

    #[test]
    fn non_numeric_field_yields_none() {
        assert_eq!(parse_sentence("$GPGGA,123519,48x7.038,N,01131.000,E,1"), None);
        assert_eq!(parse_sentence("$GPGGA,123519,4807.038,N,0é131.000,E,1"), None);
    }

    #[test]
    fn minutes_over_sixty_are_not_rejected() {
        let c = parse_sentence("$GPGGA,0,4875.000,N,01100.000,E,1").unwrap();
        assert_close(c.latitude, 49.25);
    }

    #[test]
    fn sentence_kind_layouts() {
        assert_eq!(SentenceKind::detect(GGA), SentenceKind::Fix);
        assert_eq!(SentenceKind::detect(RMC), SentenceKind::RecommendedMinimum);
        assert_eq!(SentenceKind::Fix.layout().unwrap().min_fields(), 6);
        assert_eq!(
            SentenceKind::RecommendedMinimum.layout().unwrap().min_fields(),
            7
        );
        assert!(SentenceKind::Unrecognized.layout().is_none());
    }
}
