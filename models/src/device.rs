//! Push-notification registrations for a user's devices.

use record_codec_core::{
    CollectFields, DecodeContext, DecodeError, Decoder, Encoder, EncodingError, ObjectView,
    ObjectWriter, OneOfNode, non_empty_string, one_of, optionalish, string,
};
use serde_json::Value;

/// Push service a device registers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Apple push notifications, encoded as `"iOS"`
    Ios,
    /// Firebase messaging, encoded as `"Android"`
    Android,
}

fn platform() -> OneOfNode<Platform> {
    one_of(&[("iOS", Platform::Ios), ("Android", Platform::Android)])
}

/// One device a user receives notifications on.
#[derive(Debug, Clone, PartialEq)]
pub struct UserDevice {
    /// Token issued by the push service; never empty
    pub notification_token: String,
    pub platform: Platform,
    /// Operating system version (e.g., "17.4")
    pub os_version: Option<String>,
    /// Marketing version of the app (e.g., "2.3.0")
    pub app_version: Option<String>,
    /// Build number of the app
    pub app_build: Option<String>,
    /// Preferred language tag (e.g., "en-US")
    pub language: Option<String>,
    /// IANA zone name (e.g., "Europe/Berlin")
    pub time_zone: Option<String>,
}

impl UserDevice {
    /// A registration with only the required fields set.
    pub fn new(notification_token: impl Into<String>, platform: Platform) -> Self {
        Self {
            notification_token: notification_token.into(),
            platform,
            os_version: None,
            app_version: None,
            app_build: None,
            language: None,
            time_zone: None,
        }
    }
}

/// Codec for [`UserDevice`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UserDeviceSchema;

impl Decoder for UserDeviceSchema {
    type Output = UserDevice;

    fn decode_in(&self, raw: &Value, cx: &mut DecodeContext) -> Result<UserDevice, DecodeError> {
        let object = ObjectView::new(raw, cx)?;
        let optional = optionalish(string());
        let (notification_token, platform, os_version, app_version, app_build, language, time_zone) = (
            object.field(cx, "notificationToken", &non_empty_string()),
            object.field(cx, "platform", &platform()),
            object.field(cx, "osVersion", &optional),
            object.field(cx, "appVersion", &optional),
            object.field(cx, "appBuild", &optional),
            object.field(cx, "language", &optional),
            object.field(cx, "timeZone", &optional),
        )
            .collect_fields()?;
        Ok(UserDevice {
            notification_token,
            platform,
            os_version,
            app_version,
            app_build,
            language,
            time_zone,
        })
    }

    fn expected(&self) -> String {
        "UserDevice".to_string()
    }
}

impl Encoder for UserDeviceSchema {
    type Input = UserDevice;

    fn encode(&self, device: &UserDevice) -> Result<Value, EncodingError> {
        let optional = optionalish(string());
        let mut out = ObjectWriter::new();
        out.field("notificationToken", &non_empty_string(), &device.notification_token)?
            .field("platform", &platform(), &device.platform)?
            .field("osVersion", &optional, &device.os_version)?
            .field("appVersion", &optional, &device.app_version)?
            .field("appBuild", &optional, &device.app_build)?
            .field("language", &optional, &device.language)?
            .field("timeZone", &optional, &device.time_zone)?;
        Ok(out.finish())
    }
}
