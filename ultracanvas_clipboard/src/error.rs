// Copyright 2025 the UltraCanvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use ultracanvas_native::{NativeError, Selection, Target};

/// Why a clipboard operation failed.
#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    /// The owner did not answer within the conversion timeout.
    #[error("conversion of {selection:?} to {target} timed out")]
    ConversionTimeout {
        /// Selection being read.
        selection: Selection,
        /// Requested target.
        target: Target,
    },
    /// The owner refused the target, or there is no owner.
    #[error("conversion of {selection:?} to {target} was refused")]
    ConversionRefused {
        /// Selection being read.
        selection: Selection,
        /// Requested target.
        target: Target,
    },
    /// Claiming the selection did not make us its owner.
    #[error("ownership of {0:?} was not granted")]
    NotOwner(Selection),
    /// The display connection failed.
    #[error(transparent)]
    Transport(#[from] NativeError),
}
