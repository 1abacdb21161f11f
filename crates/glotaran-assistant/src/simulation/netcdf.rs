//! Minimal NetCDF classic (CDF-1) writer
//!
//! Writes fixed-size `f64` variables only: no record dimension, no
//! attributes. That is enough for `data(time, spectral)` plus its two
//! coordinate variables, and readable by xarray / netCDF4.

use super::kinetics::Dataset;
use crate::error::{AssistantError, Result};

const MAGIC: &[u8; 4] = b"CDF\x01";
const NC_DIMENSION: u32 = 0x0A;
const NC_VARIABLE: u32 = 0x0B;
const NC_DOUBLE: u32 = 6;

/// One variable over named dimensions
pub struct Variable<'a> {
    pub name: &'a str,
    /// Indices into the dimension list
    pub dims: Vec<usize>,
    pub values: &'a [f64],
}

fn put_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_be_bytes());
}

fn put_name(buf: &mut Vec<u8>, name: &str) -> Result<()> {
    put_u32(buf, to_u32(name.len())?);
    buf.extend_from_slice(name.as_bytes());
    let padding = (4 - name.len() % 4) % 4;
    buf.extend(std::iter::repeat_n(0u8, padding));
    Ok(())
}

fn to_u32(value: usize) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| AssistantError::Generation("Dataset too large for NetCDF classic format".into()))
}

fn header(dims: &[(&str, usize)], vars: &[Variable<'_>], begins: &[u32]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.extend_from_slice(MAGIC);
    put_u32(&mut buf, 0);

    put_u32(&mut buf, NC_DIMENSION);
    put_u32(&mut buf, to_u32(dims.len())?);
    for (name, len) in dims {
        put_name(&mut buf, name)?;
        put_u32(&mut buf, to_u32(*len)?);
    }

    // Global attributes: ABSENT
    put_u32(&mut buf, 0);
    put_u32(&mut buf, 0);

    put_u32(&mut buf, NC_VARIABLE);
    put_u32(&mut buf, to_u32(vars.len())?);
    for (var, begin) in vars.iter().zip(begins) {
        put_name(&mut buf, var.name)?;
        put_u32(&mut buf, to_u32(var.dims.len())?);
        for dim in &var.dims {
            put_u32(&mut buf, to_u32(*dim)?);
        }
        put_u32(&mut buf, 0);
        put_u32(&mut buf, 0);
        put_u32(&mut buf, NC_DOUBLE);
        put_u32(&mut buf, to_u32(var.values.len() * 8)?);
        put_u32(&mut buf, *begin);
    }
    Ok(buf)
}

/// Encode dimensions and variables into a complete file image
pub fn encode(dims: &[(&str, usize)], vars: &[Variable<'_>]) -> Result<Vec<u8>> {
    for var in vars {
        let expected: usize = var.dims.iter().map(|&d| dims.get(d).map_or(0, |(_, len)| *len)).product();
        if var.dims.iter().any(|&d| d >= dims.len()) || expected != var.values.len() {
            return Err(AssistantError::Generation(format!(
                "Variable '{}' does not match its dimensions",
                var.name
            )));
        }
    }

    // Offsets are fixed width, so the first pass gives the final header size
    let placeholder = vec![0u32; vars.len()];
    let header_len = header(dims, vars, &placeholder)?.len();

    let mut begins = Vec::with_capacity(vars.len());
    let mut offset = header_len;
    for var in vars {
        begins.push(to_u32(offset)?);
        offset += var.values.len() * 8;
    }

    let mut buf = header(dims, vars, &begins)?;
    buf.reserve(offset - header_len);
    for var in vars {
        for value in var.values {
            buf.extend_from_slice(&value.to_be_bytes());
        }
    }
    Ok(buf)
}

/// `time`, `spectral` and `data(time, spectral)`
pub fn encode_dataset(dataset: &Dataset) -> Result<Vec<u8>> {
    let dims = [("time", dataset.time.len()), ("spectral", dataset.spectral.len())];
    let vars = [
        Variable { name: "time", dims: vec![0], values: &dataset.time },
        Variable { name: "spectral", dims: vec![1], values: &dataset.spectral },
        Variable { name: "data", dims: vec![0, 1], values: &dataset.data },
    ];
    encode(&dims, &vars)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_u32(bytes: &[u8], at: usize) -> u32 {
        u32::from_be_bytes(bytes[at..at + 4].try_into().unwrap())
    }

    fn read_f64(bytes: &[u8], at: usize) -> f64 {
        f64::from_be_bytes(bytes[at..at + 8].try_into().unwrap())
    }

    fn small() -> Dataset {
        Dataset {
            time: vec![0.0, 1.0],
            spectral: vec![600.0, 610.0, 620.0],
            data: vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
        }
    }

    #[test]
    fn test_header_layout() {
        let bytes = encode_dataset(&small()).unwrap();
        assert_eq!(&bytes[..4], MAGIC);
        assert_eq!(read_u32(&bytes, 4), 0);
        assert_eq!(read_u32(&bytes, 8), NC_DIMENSION);
        assert_eq!(read_u32(&bytes, 12), 2);
        // "time" needs no padding
        assert_eq!(read_u32(&bytes, 16), 4);
        assert_eq!(&bytes[20..24], b"time");
        assert_eq!(read_u32(&bytes, 24), 2);
    }

    #[test]
    fn test_data_follows_header_in_order() {
        let dataset = small();
        let bytes = encode_dataset(&dataset).unwrap();
        let data_len = 8 * (2 + 3 + 6);
        let header_len = bytes.len() - data_len;

        assert_eq!(read_f64(&bytes, header_len), 0.0);
        assert_eq!(read_f64(&bytes, header_len + 8), 1.0);
        assert_eq!(read_f64(&bytes, header_len + 16), 600.0);
        // data(1, 2) is the last value
        assert_eq!(read_f64(&bytes, bytes.len() - 8), dataset.get(1, 2));

        // The last 4 header bytes are the begin offset of `data`
        assert_eq!(read_u32(&bytes, header_len - 4) as usize, header_len + 8 * 5);
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let vars = [Variable { name: "x", dims: vec![0], values: &[1.0, 2.0] }];
        assert!(encode(&[("x", 3)], &vars).is_err());
        assert!(encode(&[], &vars).is_err());
    }
}
