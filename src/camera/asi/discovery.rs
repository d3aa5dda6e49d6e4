//! ASI camera enumeration.

use crate::camera::types::CameraInfo;

use super::api::AsiSdkApi;

/// Discover connected ASI cameras.
///
/// Cameras whose properties cannot be read are skipped with a warning.
pub fn discover_cameras<S: AsiSdkApi + ?Sized>(sdk: &S) -> Vec<CameraInfo> {
    let count = sdk.num_connected_cameras();
    let mut cameras = Vec::with_capacity(count);

    for index in 0..count {
        match sdk.camera_property(index) {
            Ok(raw) => cameras.push(CameraInfo::from(&raw)),
            Err(e) => tracing::warn!("Failed to read properties of ASI camera {index}: {e}"),
        }
    }

    cameras
}
