//! Plugin capability types and the shared-library ABI.

use crate::error::Result;
use crate::options::{OptionDescriptor, OptionSpace};

use super::loader::PluginHandle;

/// The capability interface every plugin exposes to the host.
///
/// A loaded module is modeled as one polymorphic value over this fixed
/// interface. The loader validates the whole surface before handing the
/// value out, so the rest of the system never touches a partially valid
/// plugin.
pub trait ServicePlugin {
    /// The plugin's name, unique among loaded plugins. Doubles as its
    /// option-group name and as the stem of its binary filename.
    fn name(&self) -> &str;

    /// The plugin's declared option schema. An empty list means the
    /// plugin has no configurable surface.
    fn options(&self) -> Vec<OptionDescriptor> {
        Vec::new()
    }

    /// Called once per plugin, in load order, after the option space is
    /// finalized and before the service loop starts.
    fn init(&mut self, space: &OptionSpace) -> Result<()>;

    /// Called at process shutdown, in reverse load order.
    fn teardown(&mut self) {}
}

/// Name of the entry symbol every plugin binary must export.
pub const PLUGIN_ENTRY_SYMBOL: &str = "chassis_plugin_entry";

/// Signature of the plugin entry point.
///
/// Returns a heap-allocated capability object, or null on failure.
pub type PluginEntryFn = unsafe extern "C" fn() -> *mut dyn ServicePlugin;

/// Define the exported entry point for a plugin crate.
///
/// # Example
///
/// ```ignore
/// #[derive(Default)]
/// pub struct AdminPlugin;
///
/// impl chassis::plugins::ServicePlugin for AdminPlugin {
///     // ...
/// }
///
/// chassis::export_plugin!(AdminPlugin);
/// ```
#[macro_export]
macro_rules! export_plugin {
    ($plugin_type:ty) => {
        #[no_mangle]
        pub extern "C" fn chassis_plugin_entry() -> *mut dyn $crate::plugins::ServicePlugin {
            let plugin: Box<dyn $crate::plugins::ServicePlugin> =
                Box::new(<$plugin_type>::default());
            Box::into_raw(plugin)
        }
    };
}

/// A loaded plugin, owned by the registry for the process lifetime.
pub struct Plugin {
    name: String,
    handle: PluginHandle,
}

impl Plugin {
    pub(crate) fn new(handle: PluginHandle) -> Self {
        let name = handle.instance.name().to_string();
        Self { name, handle }
    }

    /// The name the module reported at load time.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The plugin's declared option schema.
    pub fn options(&self) -> Vec<OptionDescriptor> {
        self.handle.instance.options()
    }

    pub(crate) fn init(&mut self, space: &OptionSpace) -> Result<()> {
        self.handle.instance.init(space)
    }

    pub(crate) fn teardown(&mut self) {
        self.handle.instance.teardown();
    }
}
