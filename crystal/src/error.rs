#[derive(Debug, thiserror::Error)]
pub enum CrystalError {
    #[error("cannot read structure file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("structure file line {line}: {msg}")]
    Parse { line: usize, msg: String },

    #[error("unknown atom type '{0}'")]
    UnknownAtomType(String),

    #[error("atom type '{symbol}': radial function has {found} points, radial grid has {expected}")]
    GridMismatch {
        symbol: String,
        found: usize,
        expected: usize,
    },

    #[error("atom type '{symbol}': {msg}")]
    InvalidAtomType { symbol: String, msg: String },
}
