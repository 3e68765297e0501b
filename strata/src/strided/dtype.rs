//! Translation of a strided region into a nested-block transfer type.

use super::check_shape;
use crate::error::{Result, StrataError};
use crate::transfer_type::{Order, TransferType};
use crate::types::DataType;

/// Build a committed transfer type selecting every block of one side of a
/// strided region.
///
/// For `levels > 0` the result is a `(levels + 1)`-dimensional row-major
/// subarray with all starts at zero:
///
/// - dimension `levels` (innermost): size `strides[0] / elem`, subsize `count[0] / elem`;
/// - dimension `levels - i`, `1 <= i < levels`: size `strides[i] / strides[i - 1]`,
///   subsize `count[i]`;
/// - dimension 0: size and subsize `count[levels]`.
///
/// Call once per side with that side's strides and the shared `count`.
pub fn strided_to_type(strides: &[usize], count: &[usize], elem: DataType) -> Result<TransferType> {
    check_shape(strides, count)?;
    let levels = strides.len();
    let es = elem.size_in_bytes();

    if count[0] % es != 0 {
        return Err(StrataError::not_multiple("count[0]", count[0], es));
    }

    let mut ty = if levels == 0 {
        TransferType::contiguous(count[0] / es, elem)
    } else {
        let mut sizes = vec![0usize; levels + 1];
        let mut subsizes = vec![0usize; levels + 1];
        let starts = vec![0usize; levels + 1];

        if strides[0] % es != 0 {
            return Err(StrataError::not_multiple("stride[0]", strides[0], es));
        }
        sizes[levels] = strides[0] / es;
        subsizes[levels] = count[0] / es;

        // Absolute strides become per-level block counts.
        for i in 1..levels {
            if strides[i - 1] == 0 || strides[i] % strides[i - 1] != 0 {
                return Err(StrataError::not_multiple(
                    format!("stride[{i}]"),
                    strides[i],
                    strides[i - 1],
                ));
            }
            sizes[levels - i] = strides[i] / strides[i - 1];
            subsizes[levels - i] = count[i];
        }

        sizes[0] = count[levels];
        subsizes[0] = count[levels];

        TransferType::subarray(&sizes, &subsizes, &starts, Order::RowMajor, elem)
            .map_err(|e| StrataError::descriptor(format!("strides do not nest: {e}")))?
    };

    ty.commit();
    tracing::trace!(levels, elem = %elem, bytes = ty.size(), "strided transfer type built");
    Ok(ty)
}
