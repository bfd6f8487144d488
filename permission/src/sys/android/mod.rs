//! Android permission implementation using JNI.
//!
//! Status checks call `Context.checkSelfPermission` directly. Prompts call
//! `Activity.requestPermissions`; the host activity must forward
//! `onRequestPermissionsResult` to
//! `com.marinamap.bridge.PermissionBridge.onPermissionResult(int, boolean)`.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Mutex, OnceLock};

use jni::objects::{GlobalRef, JClass, JObject, JValue};
use jni::sys::{JNI_TRUE, jboolean, jint};
use jni::{JNIEnv, JavaVM};
use log::{error, warn};

use crate::{Permission, PermissionBackend, PermissionError, PermissionResponder, PermissionStatus};

/// `PackageManager.PERMISSION_GRANTED`.
const PERMISSION_GRANTED: jint = 0;

/// Request codes must fit in the lower 16 bits.
const REQUEST_CODE_MASK: jint = 0xffff;

static NEXT_REQUEST_CODE: AtomicI32 = AtomicI32::new(1);
static PENDING: OnceLock<Mutex<HashMap<jint, PermissionResponder>>> = OnceLock::new();

fn pending() -> &'static Mutex<HashMap<jint, PermissionResponder>> {
    PENDING.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Permission backend bound to the host activity.
pub struct AndroidPermissions {
    vm: JavaVM,
    activity: GlobalRef,
}

impl fmt::Debug for AndroidPermissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AndroidPermissions").finish_non_exhaustive()
    }
}

impl AndroidPermissions {
    /// Bind to an Android `Activity`.
    ///
    /// # Errors
    /// Returns a `PermissionError` if the JVM or a global reference cannot be obtained.
    pub fn new(env: &JNIEnv<'_>, activity: &JObject<'_>) -> Result<Self, PermissionError> {
        let vm = env.get_java_vm().map_err(map_jni_error)?;
        let activity = env.new_global_ref(activity).map_err(map_jni_error)?;
        Ok(Self { vm, activity })
    }

    fn with_activity<T, F>(&self, action: F) -> Result<T, PermissionError>
    where
        F: FnOnce(&mut JNIEnv<'_>, &JObject<'_>) -> jni::errors::Result<T>,
    {
        let mut env = self.vm.attach_current_thread().map_err(map_jni_error)?;
        action(&mut env, self.activity.as_obj()).map_err(map_jni_error)
    }
}

impl PermissionBackend for AndroidPermissions {
    fn check(&self, permission: Permission) -> PermissionStatus {
        let result = self.with_activity(|env, activity| {
            let name = env.new_string(permission.android_name())?;
            env.call_method(
                activity,
                "checkSelfPermission",
                "(Ljava/lang/String;)I",
                &[JValue::Object(&name)],
            )?
            .i()
        });

        match result {
            Ok(PERMISSION_GRANTED) => PermissionStatus::Granted,
            // Android does not distinguish "never asked" from "denied".
            Ok(_) => PermissionStatus::Denied,
            Err(err) => {
                error!("checkSelfPermission failed: {err}");
                PermissionStatus::Restricted
            }
        }
    }

    fn request(
        &self,
        permission: Permission,
        responder: PermissionResponder,
    ) -> Result<(), PermissionError> {
        let code = NEXT_REQUEST_CODE.fetch_add(1, Ordering::Relaxed) & REQUEST_CODE_MASK;
        pending()
            .lock()
            .expect("pending permission mutex poisoned")
            .insert(code, responder);

        let issued = self.with_activity(|env, activity| {
            let name = env.new_string(permission.android_name())?;
            let names = env.new_object_array(1, "java/lang/String", &name)?;
            env.call_method(
                activity,
                "requestPermissions",
                "([Ljava/lang/String;I)V",
                &[JValue::Object(&names), JValue::Int(code)],
            )?;
            Ok(())
        });

        if let Err(err) = issued {
            pending()
                .lock()
                .expect("pending permission mutex poisoned")
                .remove(&code);
            return Err(err);
        }

        Ok(())
    }
}

/// Answer to a prompt issued by [`AndroidPermissions::request`].
#[allow(non_snake_case)]
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_marinamap_bridge_PermissionBridge_onPermissionResult(
    _env: JNIEnv<'_>,
    _class: JClass<'_>,
    request_code: jint,
    granted: jboolean,
) {
    let responder = pending()
        .lock()
        .expect("pending permission mutex poisoned")
        .remove(&request_code);

    match responder {
        Some(responder) => responder.respond(granted == JNI_TRUE),
        None => warn!("permission result for unknown request code {request_code}"),
    }
}

#[allow(clippy::needless_pass_by_value)]
fn map_jni_error(err: jni::errors::Error) -> PermissionError {
    PermissionError::Platform(err.to_string())
}
