//! Loading datacubes from foreign files.

use std::path::Path;

use ndarray::{Array4, ArrayD, Axis, Ix3, Ix4};

use crate::data::{DataCube, ReaderRegistry};
use crate::error::LoadError;

/// Read `path` with the foreign readers and shape the result into a datacube.
///
/// Any read or extraction failure becomes [`LoadError::ExternalLoadFailure`];
/// an array that is neither 3D nor 4D becomes [`LoadError::UnsupportedShape`].
pub fn load_foreign(path: &Path, registry: &ReaderRegistry) -> Result<DataCube, LoadError> {
    log::info!("{:?} is not a native container, reading as foreign file", path);

    let bytes = std::fs::read(path).map_err(|e| LoadError::external(path, e))?;
    let filename = path.file_name().and_then(|n| n.to_str());

    let extracted = registry
        .read(&bytes, filename)
        .map_err(|e| LoadError::external(path, e))?;

    let data = to_datacube_array(extracted.array)?;
    log::info!("Loaded {:?} with shape {:?}", path, data.shape());

    Ok(DataCube::foreign(data, path, extracted.metadata))
}

/// Interpret an array of rank 3 or 4 as `(R_Ny, R_Nx, Q_Ny, Q_Nx)`.
///
/// A 3D stack `(N, Q_Ny, Q_Nx)` becomes `(N, 1, Q_Ny, Q_Nx)`: every scan
/// position goes on the row axis and the column axis is one wide.
pub fn to_datacube_array(array: ArrayD<f32>) -> Result<Array4<f32>, LoadError> {
    let shape = array.shape().to_vec();
    let unsupported = || LoadError::UnsupportedShape {
        shape: shape.clone(),
    };

    match array.ndim() {
        3 => {
            let stack = array.into_dimensionality::<Ix3>().map_err(|_| unsupported())?;
            Ok(stack.insert_axis(Axis(1)))
        }
        4 => array.into_dimensionality::<Ix4>().map_err(|_| unsupported()),
        _ => Err(unsupported()),
    }
}

#[cfg(test)]
mod tests {
    use ndarray::IxDyn;

    use super::*;

    #[test]
    fn test_rank_3_goes_on_scan_rows() {
        let stack = ArrayD::from_shape_fn(IxDyn(&[6, 4, 5]), |ix| (ix[0] * 100 + ix[1] * 10 + ix[2]) as f32);
        let cube = to_datacube_array(stack).unwrap();

        assert_eq!(cube.dim(), (6, 1, 4, 5));
        assert_eq!(cube[[5, 0, 3, 4]], 534.0);
    }

    #[test]
    fn test_rank_4_unchanged() {
        let array = ArrayD::<f32>::zeros(IxDyn(&[2, 3, 4, 5]));
        assert_eq!(to_datacube_array(array).unwrap().dim(), (2, 3, 4, 5));
    }

    #[test]
    fn test_other_ranks_rejected() {
        for shape in [vec![4, 4], vec![1, 2, 3, 4, 5], vec![7]] {
            let array = ArrayD::<f32>::zeros(IxDyn(&shape));
            match to_datacube_array(array) {
                Err(LoadError::UnsupportedShape { shape: found }) => assert_eq!(found, shape),
                other => panic!("expected UnsupportedShape, got {:?}", other.map(|a| a.dim())),
            }
        }
    }

    #[test]
    fn test_missing_file_is_external_failure() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_foreign(&dir.path().join("nope.npy"), &ReaderRegistry::new());
        assert!(matches!(result, Err(LoadError::ExternalLoadFailure { .. })));
    }
}
