use std::io::{BufReader, BufWriter, Read, Write};

use crate::error::GmmError;
use crate::gmm::Gmm;

/// Binary format magic and version.
const GMM_MAGIC: [u8; 4] = [b'V', b'X', b'G', b'M'];
const GMM_VERSION: u32 = 1;

/// Geometry caps applied before any payload allocation, so a corrupt
/// header cannot request absurd buffers.
const MAX_DIM: usize = 4096;
const MAX_COMPONENTS: usize = 65536;

/// Serializes a mixture model to a writer in a compact binary format.
///
/// ```text
/// [4B magic "VXGM"] [4B version=1]
/// [4B dim] [4B components]
/// [components x 8B float64 weights]
/// For each component:
///   [dim x 8B float64 mean]
/// For each component:
///   [dim x 8B float64 variance]
/// ```
///
/// All multi-byte values are little-endian. The round trip through
/// [`read_gmm`] is lossless: parameter bit patterns are preserved.
pub fn write_gmm(gmm: &Gmm, w: &mut dyn Write) -> Result<(), GmmError> {
    let mut bw = BufWriter::new(w);

    let write_err = |e: std::io::Error| GmmError::Io(e.to_string());

    // Header.
    bw.write_all(&GMM_MAGIC).map_err(write_err)?;
    bw.write_all(&GMM_VERSION.to_le_bytes()).map_err(write_err)?;
    bw.write_all(&(gmm.dim() as u32).to_le_bytes()).map_err(write_err)?;
    bw.write_all(&(gmm.num_components() as u32).to_le_bytes()).map_err(write_err)?;

    // Parameters.
    for &weight in gmm.weights() {
        bw.write_all(&weight.to_le_bytes()).map_err(write_err)?;
    }
    for mean in gmm.means() {
        for &v in mean {
            bw.write_all(&v.to_le_bytes()).map_err(write_err)?;
        }
    }
    for var in gmm.vars() {
        for &v in var {
            bw.write_all(&v.to_le_bytes()).map_err(write_err)?;
        }
    }

    bw.flush().map_err(write_err)?;
    Ok(())
}

/// Deserializes a mixture model written by [`write_gmm`].
///
/// The header is validated before any payload is read; parameter values
/// are checked for finiteness and positive variances, and the weight
/// vector goes through full model validation. A truncated stream surfaces
/// as [`GmmError::Io`].
pub fn read_gmm(r: &mut dyn Read) -> Result<Gmm, GmmError> {
    let mut br = BufReader::new(r);
    let read_err = |e: std::io::Error| GmmError::Io(e.to_string());

    // Magic.
    let mut magic = [0u8; 4];
    br.read_exact(&mut magic).map_err(read_err)?;
    if magic != GMM_MAGIC {
        return Err(GmmError::InvalidFormat(format!("invalid magic {magic:?}")));
    }

    let read_u32 = |br: &mut BufReader<&mut dyn Read>| -> Result<u32, GmmError> {
        let mut buf = [0u8; 4];
        br.read_exact(&mut buf).map_err(|e| GmmError::Io(e.to_string()))?;
        Ok(u32::from_le_bytes(buf))
    };
    let read_f64 = |br: &mut BufReader<&mut dyn Read>| -> Result<f64, GmmError> {
        let mut buf = [0u8; 8];
        br.read_exact(&mut buf).map_err(|e| GmmError::Io(e.to_string()))?;
        Ok(f64::from_le_bytes(buf))
    };

    // Version.
    let version = read_u32(&mut br)?;
    if version != GMM_VERSION {
        return Err(GmmError::InvalidFormat(format!(
            "unsupported version {version} (want {GMM_VERSION})"
        )));
    }

    // Geometry.
    let dim = read_u32(&mut br)? as usize;
    let k = read_u32(&mut br)? as usize;
    if dim == 0 || k == 0 {
        return Err(GmmError::InvalidFormat(format!(
            "invalid geometry: {k} components x {dim} dims"
        )));
    }
    if dim > MAX_DIM || k > MAX_COMPONENTS {
        return Err(GmmError::InvalidFormat(format!(
            "geometry {k} x {dim} exceeds limits {MAX_COMPONENTS} x {MAX_DIM}"
        )));
    }

    // Parameters.
    let mut weights = Vec::with_capacity(k);
    for _ in 0..k {
        weights.push(read_f64(&mut br)?);
    }
    let mut means = Vec::with_capacity(k);
    for _ in 0..k {
        let mut row = Vec::with_capacity(dim);
        for _ in 0..dim {
            row.push(read_f64(&mut br)?);
        }
        means.push(row);
    }
    let mut vars = Vec::with_capacity(k);
    for _ in 0..k {
        let mut row = Vec::with_capacity(dim);
        for _ in 0..dim {
            row.push(read_f64(&mut br)?);
        }
        vars.push(row);
    }

    if weights.iter().any(|v| !v.is_finite())
        || means.iter().flatten().any(|v| !v.is_finite())
        || vars.iter().flatten().any(|v| !v.is_finite())
    {
        return Err(GmmError::InvalidFormat("non-finite parameter".into()));
    }
    if vars.iter().flatten().any(|v| *v <= 0.0) {
        return Err(GmmError::InvalidFormat("non-positive variance".into()));
    }

    Gmm::new(weights, means, vars)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_gmm() -> Gmm {
        Gmm::new(
            vec![0.25, 0.75],
            vec![vec![1.5, -2.5, 0.125], vec![-0.5, 3.0, 1.0]],
            vec![vec![1.0, 0.5, 2.0], vec![0.25, 1.25, 0.75]],
        )
        .unwrap()
    }

    #[test]
    fn test_write_read_round_trip() {
        let g = test_gmm();
        let mut buf = Vec::new();
        write_gmm(&g, &mut buf).unwrap();

        let g2 = read_gmm(&mut buf.as_slice()).unwrap();
        assert_eq!(g2.dim(), g.dim());
        assert_eq!(g2.num_components(), g.num_components());
        assert_eq!(g2.weights(), g.weights());
        assert_eq!(g2.means(), g.means());
        assert_eq!(g2.vars(), g.vars());
    }

    #[test]
    fn test_read_invalid_magic() {
        let bad = b"NOPE";
        assert!(matches!(
            read_gmm(&mut bad.as_slice()),
            Err(GmmError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_read_unsupported_version() {
        let mut buf = Vec::new();
        write_gmm(&test_gmm(), &mut buf).unwrap();
        buf[4..8].copy_from_slice(&99u32.to_le_bytes());
        assert!(matches!(
            read_gmm(&mut buf.as_slice()),
            Err(GmmError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_read_truncated_stream() {
        let mut buf = Vec::new();
        write_gmm(&test_gmm(), &mut buf).unwrap();
        buf.truncate(buf.len() - 5);
        assert!(matches!(
            read_gmm(&mut buf.as_slice()),
            Err(GmmError::Io(_))
        ));
    }

    #[test]
    fn test_read_rejects_absurd_geometry() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&GMM_MAGIC);
        buf.extend_from_slice(&GMM_VERSION.to_le_bytes());
        buf.extend_from_slice(&u32::MAX.to_le_bytes());
        buf.extend_from_slice(&1u32.to_le_bytes());
        assert!(matches!(
            read_gmm(&mut buf.as_slice()),
            Err(GmmError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_read_rejects_zero_components() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&GMM_MAGIC);
        buf.extend_from_slice(&GMM_VERSION.to_le_bytes());
        buf.extend_from_slice(&3u32.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        assert!(matches!(
            read_gmm(&mut buf.as_slice()),
            Err(GmmError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_read_rejects_corrupt_variance() {
        // single component, single dim: variance lives in the last 8 bytes
        let g = Gmm::new(vec![1.0], vec![vec![0.5]], vec![vec![2.0]]).unwrap();
        let mut buf = Vec::new();
        write_gmm(&g, &mut buf).unwrap();
        let at = buf.len() - 8;
        buf[at..].copy_from_slice(&(-1.0f64).to_le_bytes());
        assert!(matches!(
            read_gmm(&mut buf.as_slice()),
            Err(GmmError::InvalidFormat(_))
        ));
    }
}
