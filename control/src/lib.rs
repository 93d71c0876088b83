use tracing::info;
use types::ProcessingUnit;

use std::{
    fmt,
    fs::File,
    io::{BufRead, BufReader},
    str::FromStr,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read control file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown parameter : {0}")]
    UnknownKey(String),

    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue { key: String, value: String, reason: String },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ElectronicStructureMethod {
    Pseudopotential,
    FullPotentialLapwlo,
}

impl Default for ElectronicStructureMethod {
    fn default() -> Self {
        ElectronicStructureMethod::Pseudopotential
    }
}

impl FromStr for ElectronicStructureMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pseudopotential" => Ok(ElectronicStructureMethod::Pseudopotential),
            "full_potential_lapwlo" => Ok(ElectronicStructureMethod::FullPotentialLapwlo),
            other => Err(format!("unknown electronic structure method '{}'", other)),
        }
    }
}

impl fmt::Display for ElectronicStructureMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ElectronicStructureMethod::Pseudopotential => write!(f, "pseudopotential"),
            ElectronicStructureMethod::FullPotentialLapwlo => write!(f, "full_potential_lapwlo"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Control {
    verbosity: String,
    processing_unit: ProcessingUnit,
    electronic_structure_method: ElectronicStructureMethod,

    num_mag_dims: usize,
    gamma_point: bool,
    so_correction: bool,

    hubbard_correction: bool,
    hubbard_simplified: bool,
    hubbard_orthogonalize: bool,
    hubbard_normalize: bool,

    extra_charge: f64,
    rmt_max: f64,
    pw_cutoff: f64, // |G| max, bohr^-1
    gk_cutoff: f64, // |G+k| max, bohr^-1
    lmax_rho: usize,
    lmax_apw: usize,

    fft_comm_size: usize,
    reduce_gvec: bool,
    gvec_chunk_size: usize,
    beta_chunk_size: usize,

    print_checksum: bool,
}

impl Default for Control {
    fn default() -> Control {
        Control {
            verbosity: "normal".to_string(),
            processing_unit: ProcessingUnit::Cpu,
            electronic_structure_method: ElectronicStructureMethod::Pseudopotential,
            num_mag_dims: 0,
            gamma_point: false,
            so_correction: false,
            hubbard_correction: false,
            hubbard_simplified: false,
            hubbard_orthogonalize: false,
            hubbard_normalize: false,
            extra_charge: 0.0,
            rmt_max: 2.2,
            pw_cutoff: 20.0,
            gk_cutoff: 6.0,
            lmax_rho: 8,
            lmax_apw: 8,
            fft_comm_size: 1,
            reduce_gvec: false,
            gvec_chunk_size: 256,
            beta_chunk_size: 256,
            print_checksum: false,
        }
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value.parse::<T>().map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}

impl Control {
    pub fn new() -> Control {
        Control::default()
    }

    pub fn get_verbosity(&self) -> &str {
        &self.verbosity
    }

    pub fn get_processing_unit(&self) -> ProcessingUnit {
        self.processing_unit
    }

    pub fn get_electronic_structure_method(&self) -> ElectronicStructureMethod {
        self.electronic_structure_method
    }

    pub fn full_potential(&self) -> bool {
        self.electronic_structure_method == ElectronicStructureMethod::FullPotentialLapwlo
    }

    pub fn get_num_mag_dims(&self) -> usize {
        self.num_mag_dims
    }

    pub fn num_spins(&self) -> usize {
        if self.num_mag_dims == 0 {
            1
        } else {
            2
        }
    }

    /// Number of density components: rho plus magnetization.
    pub fn num_mag_comp(&self) -> usize {
        self.num_mag_dims + 1
    }

    /// Independent spin dimensions of the wave functions; spinors count as one.
    pub fn num_spin_dims(&self) -> usize {
        if self.num_mag_dims == 3 {
            1
        } else {
            self.num_spins()
        }
    }

    pub fn get_gamma_point(&self) -> bool {
        self.gamma_point
    }

    pub fn get_so_correction(&self) -> bool {
        self.so_correction
    }

    pub fn get_hubbard_correction(&self) -> bool {
        self.hubbard_correction
    }

    pub fn get_hubbard_simplified(&self) -> bool {
        self.hubbard_simplified
    }

    pub fn get_hubbard_orthogonalize(&self) -> bool {
        self.hubbard_orthogonalize
    }

    pub fn get_hubbard_normalize(&self) -> bool {
        self.hubbard_normalize
    }

    pub fn get_extra_charge(&self) -> f64 {
        self.extra_charge
    }

    pub fn get_rmt_max(&self) -> f64 {
        self.rmt_max
    }

    pub fn get_pw_cutoff(&self) -> f64 {
        self.pw_cutoff
    }

    pub fn get_gk_cutoff(&self) -> f64 {
        self.gk_cutoff
    }

    pub fn get_lmax_rho(&self) -> usize {
        self.lmax_rho
    }

    pub fn lmmax_rho(&self) -> usize {
        (self.lmax_rho + 1) * (self.lmax_rho + 1)
    }

    pub fn get_lmax_apw(&self) -> usize {
        self.lmax_apw
    }

    pub fn get_fft_comm_size(&self) -> usize {
        self.fft_comm_size
    }

    pub fn get_reduce_gvec(&self) -> bool {
        self.reduce_gvec
    }

    pub fn get_gvec_chunk_size(&self) -> usize {
        self.gvec_chunk_size
    }

    pub fn get_beta_chunk_size(&self) -> usize {
        self.beta_chunk_size
    }

    pub fn get_print_checksum(&self) -> bool {
        self.print_checksum
    }

    pub fn read_file(&mut self, inpfile: &str) -> Result<(), ConfigError> {
        let lines = self.read_file_data_to_vec(inpfile)?;

        self.read_lines(&lines)
    }

    pub fn read_file_data_to_vec(&self, inpfile: &str) -> Result<Vec<String>, ConfigError> {
        let file = File::open(inpfile).map_err(|source| ConfigError::Io {
            path: inpfile.to_string(),
            source,
        })?;

        BufReader::new(file)
            .lines()
            .collect::<Result<Vec<String>, _>>()
            .map_err(|source| ConfigError::Io {
                path: inpfile.to_string(),
                source,
            })
    }

    /// Apply `key = value` lines; `#` starts a comment.
    pub fn read_lines<S: AsRef<str>>(&mut self, lines: &[S]) -> Result<(), ConfigError> {
        for line in lines.iter() {
            let line = line.as_ref().split('#').next().unwrap_or("");

            let s: Vec<&str> = line.split('=').map(|x| x.trim()).collect();

            if s[0].is_empty() {
                continue;
            }

            if s.len() != 2 {
                return Err(ConfigError::UnknownKey(line.trim().to_string()));
            }

            let (key, value) = (s[0], s[1]);

            match key {
                "verbosity" => {
                    self.verbosity = match value.to_lowercase().as_str() {
                        v @ ("low" | "normal" | "high") => v.to_string(),
                        _ => {
                            return Err(ConfigError::InvalidValue {
                                key: key.to_string(),
                                value: value.to_string(),
                                reason: "expected low, normal or high".to_string(),
                            })
                        }
                    };
                }
                "processing_unit" => {
                    self.processing_unit = parse_value(key, value)?;
                }
                "electronic_structure_method" => {
                    self.electronic_structure_method = parse_value(key, value)?;
                }
                "num_mag_dims" => {
                    self.num_mag_dims = parse_value(key, value)?;
                    if ![0, 1, 3].contains(&self.num_mag_dims) {
                        return Err(ConfigError::InvalidValue {
                            key: key.to_string(),
                            value: value.to_string(),
                            reason: "expected 0, 1 or 3".to_string(),
                        });
                    }
                }
                "gamma_point" => {
                    self.gamma_point = parse_value(key, value)?;
                }
                "so_correction" => {
                    self.so_correction = parse_value(key, value)?;
                }
                "hubbard_correction" => {
                    self.hubbard_correction = parse_value(key, value)?;
                }
                "hubbard_simplified" => {
                    self.hubbard_simplified = parse_value(key, value)?;
                }
                "hubbard_orthogonalize" => {
                    self.hubbard_orthogonalize = parse_value(key, value)?;
                }
                "hubbard_normalize" => {
                    self.hubbard_normalize = parse_value(key, value)?;
                }
                "extra_charge" => {
                    self.extra_charge = parse_value(key, value)?;
                }
                "rmt_max" => {
                    self.rmt_max = parse_value(key, value)?;
                }
                "pw_cutoff" => {
                    self.pw_cutoff = parse_value(key, value)?;
                }
                "gk_cutoff" => {
                    self.gk_cutoff = parse_value(key, value)?;
                }
                "lmax_rho" => {
                    self.lmax_rho = parse_value(key, value)?;
                }
                "lmax_apw" => {
                    self.lmax_apw = parse_value(key, value)?;
                }
                "fft_comm_size" => {
                    self.fft_comm_size = parse_value(key, value)?;
                }
                "reduce_gvec" => {
                    self.reduce_gvec = parse_value(key, value)?;
                }
                "gvec_chunk_size" => {
                    self.gvec_chunk_size = parse_value(key, value)?;
                }
                "beta_chunk_size" => {
                    self.beta_chunk_size = parse_value(key, value)?;
                }
                "print_checksum" => {
                    self.print_checksum = parse_value(key, value)?;
                }
                _ => {
                    return Err(ConfigError::UnknownKey(line.trim().to_string()));
                }
            }
        }

        if self.so_correction && self.num_mag_dims != 3 {
            return Err(ConfigError::InvalidValue {
                key: "so_correction".to_string(),
                value: "true".to_string(),
                reason: "spin-orbit coupling needs num_mag_dims = 3".to_string(),
            });
        }

        if self.fft_comm_size == 0 || self.gvec_chunk_size == 0 || self.beta_chunk_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "chunk/communicator size".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }

        Ok(())
    }

    pub fn display(&self) {
        const OUT_WIDTH1: usize = 28;
        const OUT_WIDTH2: usize = 18;

        info!("{:-^80}", " control parameters ");

        let rows: Vec<(&str, String)> = vec![
            ("verbosity", self.verbosity.clone()),
            ("processing_unit", self.processing_unit.to_string()),
            ("electronic_structure_method", self.electronic_structure_method.to_string()),
            ("num_mag_dims", self.num_mag_dims.to_string()),
            ("gamma_point", self.gamma_point.to_string()),
            ("so_correction", self.so_correction.to_string()),
            ("hubbard_correction", self.hubbard_correction.to_string()),
            ("hubbard_simplified", self.hubbard_simplified.to_string()),
            ("hubbard_orthogonalize", self.hubbard_orthogonalize.to_string()),
            ("hubbard_normalize", self.hubbard_normalize.to_string()),
            ("extra_charge", format!("{:.6}", self.extra_charge)),
            ("rmt_max", format!("{:.4}", self.rmt_max)),
            ("pw_cutoff", format!("{:.4}", self.pw_cutoff)),
            ("gk_cutoff", format!("{:.4}", self.gk_cutoff)),
            ("lmax_rho", self.lmax_rho.to_string()),
            ("lmax_apw", self.lmax_apw.to_string()),
            ("fft_comm_size", self.fft_comm_size.to_string()),
            ("reduce_gvec", self.reduce_gvec.to_string()),
            ("gvec_chunk_size", self.gvec_chunk_size.to_string()),
            ("beta_chunk_size", self.beta_chunk_size.to_string()),
            ("print_checksum", self.print_checksum.to_string()),
        ];

        for (key, value) in rows.iter() {
            info!(
                "{:<width1$} = {:>width2$}",
                key,
                value,
                width1 = OUT_WIDTH1,
                width2 = OUT_WIDTH2
            );
        }
    }
}
