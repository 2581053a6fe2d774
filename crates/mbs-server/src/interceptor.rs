//! The interceptor: the server's single entry point.
//!
//! Every client request is validated here, checked against the access
//! controller, and then delegated to the repository, the instantiator, or
//! the introspector. Successful registrations and unregistrations are
//! announced through the server delegate.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::{Arc, Condvar, Mutex};

use mbs_notify::{
    delegate_name, Handback, NotificationEmitter, NotificationFilter, NotificationListener,
    ServerDelegate, WrapperTable,
};
use mbs_repository::{InMemoryRepository, Repository};
use mbs_security::{AccessController, Action, Permission, PermissionPolicy};
use mbs_types::{
    Attribute, AttributeList, BeanInfo, ObjectInstance, ObjectName, ObjectRef,
    ServerNotificationKind, Value,
};
use tracing::{debug, info, trace};

use crate::bean::ManagedBean;
use crate::class::{ClassLoader, ClassPath};
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::instantiator::{DefaultInstantiator, Instantiator};
use crate::introspector::{Introspector, StandardIntrospector};
use crate::query::{QueryContext, QueryError, QueryExp};

/// What the repository stores for each registered name.
#[derive(Clone)]
pub struct RegisteredBean {
    pub bean: Arc<dyn ManagedBean>,
    pub class_name: String,
    /// Interfaces declared by the bean's class, when it was created by the
    /// server.
    pub interfaces: Vec<String>,
    /// Loader that found the bean's class, when it was created by the
    /// server.
    pub loader: Option<Arc<dyn ClassLoader>>,
}

impl fmt::Debug for RegisteredBean {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredBean")
            .field("bean", &ObjectRef::of_arc(&self.bean))
            .field("class_name", &self.class_name)
            .finish()
    }
}

/// Builder for [`Interceptor`]. Every collaborator not supplied gets its
/// in-process default.
#[derive(Default)]
pub struct InterceptorBuilder {
    config: ServerConfig,
    class_path: Option<Arc<ClassPath>>,
    repository: Option<Arc<dyn Repository<RegisteredBean>>>,
    instantiator: Option<Arc<dyn Instantiator>>,
    introspector: Option<Arc<dyn Introspector>>,
    access: Option<Arc<dyn AccessController>>,
}

impl InterceptorBuilder {
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Classes the default instantiator can create. Ignored when an
    /// instantiator is supplied.
    pub fn class_path(mut self, class_path: Arc<ClassPath>) -> Self {
        self.class_path = Some(class_path);
        self
    }

    pub fn repository(mut self, repository: Arc<dyn Repository<RegisteredBean>>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn instantiator(mut self, instantiator: Arc<dyn Instantiator>) -> Self {
        self.instantiator = Some(instantiator);
        self
    }

    pub fn introspector(mut self, introspector: Arc<dyn Introspector>) -> Self {
        self.introspector = Some(introspector);
        self
    }

    /// Use this access controller instead of one built from the
    /// configuration's security section.
    pub fn access_controller(mut self, access: Arc<dyn AccessController>) -> Self {
        self.access = Some(access);
        self
    }

    pub fn build(self) -> ServerResult<Interceptor> {
        let config = self.config;
        config.validate()?;

        let repository: Arc<dyn Repository<RegisteredBean>> = match self.repository {
            Some(repository) => repository,
            None => Arc::new(InMemoryRepository::<RegisteredBean>::new(
                config.default_domain.clone(),
            )),
        };
        let instantiator: Arc<dyn Instantiator> = match self.instantiator {
            Some(instantiator) => instantiator,
            None => Arc::new(DefaultInstantiator::new(
                self.class_path.unwrap_or_default(),
                config.allow_dynamic_class_loaders,
            )),
        };
        let introspector: Arc<dyn Introspector> = match self.introspector {
            Some(introspector) => introspector,
            None => Arc::new(StandardIntrospector::new()),
        };
        let access = match self.access {
            Some(access) => Some(access),
            None => match config.security {
                Some(security) => {
                    let policy = PermissionPolicy::from_config(security)
                        .map_err(|e| ServerError::Config(e.to_string()))?;
                    Some(Arc::new(policy) as Arc<dyn AccessController>)
                }
                None => None,
            },
        };

        let delegate = Arc::new(ServerDelegate::new());
        let delegate_bean: Arc<dyn ManagedBean> = delegate.clone();
        repository.insert(
            &delegate_name(),
            RegisteredBean {
                class_name: introspector.class_name(&*delegate_bean),
                bean: delegate_bean,
                interfaces: Vec::new(),
                loader: None,
            },
        )?;

        let interceptor = Interceptor {
            default_domain: repository.default_domain().to_string(),
            repository,
            instantiator,
            introspector,
            access,
            delegate,
            wrappers: WrapperTable::new(),
            mutations: Mutex::new(HashSet::new()),
            deregistered: Condvar::new(),
        };
        info!(
            server_id = interceptor.delegate.server_id(),
            default_domain = %interceptor.default_domain,
            secured = interceptor.access.is_some(),
            "managed bean server started"
        );
        Ok(interceptor)
    }
}

/// The managed bean server.
pub struct Interceptor {
    default_domain: String,
    repository: Arc<dyn Repository<RegisteredBean>>,
    instantiator: Arc<dyn Instantiator>,
    introspector: Arc<dyn Introspector>,
    access: Option<Arc<dyn AccessController>>,
    delegate: Arc<ServerDelegate>,
    wrappers: WrapperTable,
    /// Serialises repository mutations. Holds the names whose
    /// unregistration is in progress.
    mutations: Mutex<HashSet<ObjectName>>,
    /// Signalled whenever an unregistration finishes.
    deregistered: Condvar,
}

impl Interceptor {
    pub fn builder() -> InterceptorBuilder {
        InterceptorBuilder::default()
    }

    /// A server with default collaborators for `config`.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        Self::builder().config(config).build()
    }

    pub fn default_domain(&self) -> &str {
        &self.default_domain
    }

    pub fn delegate(&self) -> &Arc<ServerDelegate> {
        &self.delegate
    }

    pub fn get_bean_count(&self) -> usize {
        self.repository.count()
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Find `class_name`, construct a bean from it, and register it.
    ///
    /// Without `loader` the class is looked up on the server class path and
    /// then in the class loader repository; with one, only in the
    /// class-loader bean registered under that name.
    ///
    /// There is no separate "server loader only" form. The class path is
    /// always searched first, so a `None` loader finds every class the
    /// server's own loader would, and falls back to the repository only for
    /// classes the class path does not define.
    pub fn create_bean(
        &self,
        class_name: &str,
        name: Option<&ObjectName>,
        loader: Option<&ObjectName>,
        params: &[Value],
        signature: &[String],
    ) -> ServerResult<ObjectInstance> {
        if class_name.is_empty() {
            return Err(ServerError::IllegalArgument("class name cannot be empty".into()));
        }
        let name = self.requested_name(name)?;

        self.check(Some(class_name), None, None, Action::Instantiate)?;
        self.check(Some(class_name), None, name.as_ref(), Action::RegisterMBean)?;

        let loaded = match loader {
            None => self.instantiator.find_class(class_name)?,
            Some(loader_name) => {
                let loader = self.loader_bean(loader_name)?;
                self.instantiator.find_class_in(class_name, loader)?
            }
        };
        trace!(class = class_name, "class resolved");

        self.check_trust(loaded.class.name())?;
        self.instantiator.test_creation(&loaded.class)?;
        self.introspector.test_class(&loaded.class)?;

        let bean = self.instantiator.instantiate(&loaded.class, params, signature)?;
        let info = self.introspector.test_compliance(&*bean)?;
        self.register(
            info.class_name,
            bean,
            name,
            loaded.class.interfaces().to_vec(),
            Some(loaded.loader),
        )
    }

    /// Register an existing bean. `name` may be absent if the bean's
    /// pre-register hook supplies one.
    pub fn register_bean(
        &self,
        bean: Arc<dyn ManagedBean>,
        name: Option<&ObjectName>,
    ) -> ServerResult<ObjectInstance> {
        let info = self.introspector.test_compliance(&*bean)?;
        let name = self.requested_name(name)?;
        self.check(Some(&info.class_name), None, name.as_ref(), Action::RegisterMBean)?;
        self.check_trust(&info.class_name)?;
        self.register(info.class_name, bean, name, Vec::new(), None)
    }

    /// Registration common to creation and registration of existing beans:
    /// hooks, final permission check, insertion, announcement.
    fn register(
        &self,
        class_name: String,
        bean: Arc<dyn ManagedBean>,
        name: Option<ObjectName>,
        interfaces: Vec<String>,
        loader: Option<Arc<dyn ClassLoader>>,
    ) -> ServerResult<ObjectInstance> {
        let name = match self.introspector.pre_register(&*bean, name.as_ref()) {
            Ok(Some(name)) => name,
            Ok(None) => {
                self.introspector.post_register(&*bean, false);
                return Err(ServerError::IllegalArgument(
                    "no object name specified".into(),
                ));
            }
            Err(e) => {
                self.introspector.post_register(&*bean, false);
                return Err(e);
            }
        };

        match self.insert(&class_name, &bean, name, interfaces, loader) {
            Ok(name) => {
                self.introspector.post_register(&*bean, true);
                self.delegate
                    .publish(ServerNotificationKind::Registered, &name);
                info!(name = %name, class = %class_name, "bean registered");
                Ok(ObjectInstance::new(name, class_name))
            }
            Err(e) => {
                debug!(error = %e, "registration failed");
                self.introspector.post_register(&*bean, false);
                Err(e)
            }
        }
    }

    fn insert(
        &self,
        class_name: &str,
        bean: &Arc<dyn ManagedBean>,
        name: ObjectName,
        interfaces: Vec<String>,
        loader: Option<Arc<dyn ClassLoader>>,
    ) -> ServerResult<ObjectName> {
        if name.is_pattern() {
            return Err(ServerError::InvalidName(format!("{name} is a pattern")));
        }
        let name = self.non_default(&name);
        self.check(Some(class_name), None, Some(&name), Action::RegisterMBean)?;

        let class_loader = Arc::clone(bean).as_class_loader();
        let loaders = self.instantiator.class_loader_repository();
        if class_loader.is_some() && loaders.is_none() {
            return Err(ServerError::OperationNotSupported(
                "dynamic class loaders are disabled".into(),
            ));
        }

        let entry = RegisteredBean {
            bean: Arc::clone(bean),
            class_name: class_name.to_string(),
            interfaces,
            loader,
        };
        let _guard = self.mutations.lock().expect("interceptor lock poisoned");
        self.repository.insert(&name, entry)?;
        if let (Some(class_loader), Some(loaders)) = (class_loader, loaders) {
            loaders.add(name.clone(), class_loader);
        }
        Ok(name)
    }

    /// Unregister the bean bound to `name`.
    ///
    /// The pre-deregister hook runs at most once per registration, however
    /// many threads race to unregister the same name: later callers wait for
    /// the first to finish and then see `NotFound`.
    pub fn unregister_bean(&self, name: &ObjectName) -> ServerResult<()> {
        if name.is_pattern() {
            return Err(ServerError::InvalidName(format!("{name} is a pattern")));
        }
        let name = self.non_default(name);
        if name == delegate_name() {
            return Err(ServerError::IllegalArgument(
                "the server delegate cannot be unregistered".into(),
            ));
        }

        let entry = self.lookup(&name)?;
        self.check(Some(&entry.class_name), None, Some(&name), Action::UnregisterMBean)?;

        let entry = self.begin_unregister(&name)?;
        let removed = self.remove(&name, &entry);
        self.end_unregister(&name);
        removed?;

        self.delegate
            .publish(ServerNotificationKind::Unregistered, &name);
        self.introspector.post_deregister(&*entry.bean);
        info!(name = %name, "bean unregistered");
        Ok(())
    }

    fn begin_unregister(&self, name: &ObjectName) -> ServerResult<RegisteredBean> {
        let mut pending = self.mutations.lock().expect("interceptor lock poisoned");
        while pending.contains(name) {
            pending = self
                .deregistered
                .wait(pending)
                .expect("interceptor lock poisoned");
        }
        let entry = self
            .repository
            .lookup(name)?
            .ok_or_else(|| ServerError::NotFound(name.clone()))?;
        pending.insert(name.clone());
        Ok(entry)
    }

    fn remove(&self, name: &ObjectName, entry: &RegisteredBean) -> ServerResult<()> {
        self.introspector.pre_deregister(&*entry.bean)?;
        let _guard = self.mutations.lock().expect("interceptor lock poisoned");
        self.repository.remove(name)?;
        if let Some(loaders) = self.instantiator.class_loader_repository() {
            loaders.remove(name);
        }
        Ok(())
    }

    fn end_unregister(&self, name: &ObjectName) {
        self.mutations
            .lock()
            .expect("interceptor lock poisoned")
            .remove(name);
        self.deregistered.notify_all();
    }

    // -----------------------------------------------------------------------
    // Attributes and operations
    // -----------------------------------------------------------------------

    pub fn get_attribute(&self, name: &ObjectName, attribute: &str) -> ServerResult<Value> {
        let name = self.non_default(name);
        let entry = self.lookup(&name)?;
        self.check(Some(&entry.class_name), Some(attribute), Some(&name), Action::GetAttribute)?;
        self.introspector.get_attribute(&*entry.bean, attribute)
    }

    /// Read several attributes. With an access controller, attributes the
    /// caller may not read are silently left out.
    pub fn get_attributes(
        &self,
        name: &ObjectName,
        attributes: &[String],
    ) -> ServerResult<AttributeList> {
        let name = self.non_default(name);
        let entry = self.lookup(&name)?;
        let allowed = self.permitted_members(&entry, &name, attributes, Action::GetAttribute)?;
        Ok(self.introspector.get_attributes(&*entry.bean, &allowed))
    }

    pub fn set_attribute(&self, name: &ObjectName, attribute: Attribute) -> ServerResult<()> {
        let name = self.non_default(name);
        let entry = self.lookup(&name)?;
        self.check(
            Some(&entry.class_name),
            Some(&attribute.name),
            Some(&name),
            Action::SetAttribute,
        )?;
        self.introspector.set_attribute(&*entry.bean, attribute)
    }

    /// Write several attributes, returning the ones written. With an access
    /// controller, attributes the caller may not write are silently left
    /// out.
    pub fn set_attributes(
        &self,
        name: &ObjectName,
        attributes: AttributeList,
    ) -> ServerResult<AttributeList> {
        let name = self.non_default(name);
        let entry = self.lookup(&name)?;
        let names: Vec<String> = attributes.iter().map(|a| a.name.clone()).collect();
        let allowed = self.permitted_members(&entry, &name, &names, Action::SetAttribute)?;
        let attributes = attributes
            .into_iter()
            .filter(|a| allowed.contains(&a.name))
            .collect();
        Ok(self.introspector.set_attributes(&*entry.bean, attributes))
    }

    pub fn invoke(
        &self,
        name: &ObjectName,
        operation: &str,
        params: &[Value],
        signature: &[String],
    ) -> ServerResult<Value> {
        let name = self.non_default(name);
        let entry = self.lookup(&name)?;
        self.check(Some(&entry.class_name), Some(operation), Some(&name), Action::Invoke)?;
        debug!(name = %name, operation, "invoking");
        self.introspector
            .invoke(&*entry.bean, operation, params, signature)
    }

    // -----------------------------------------------------------------------
    // Lookup and metadata
    // -----------------------------------------------------------------------

    pub fn get_object_instance(&self, name: &ObjectName) -> ServerResult<ObjectInstance> {
        let name = self.non_default(name);
        let entry = self.lookup(&name)?;
        self.check(Some(&entry.class_name), None, Some(&name), Action::GetObjectInstance)?;
        Ok(ObjectInstance::new(name, entry.class_name))
    }

    pub fn is_registered(&self, name: &ObjectName) -> ServerResult<bool> {
        Ok(self.repository.contains(&self.non_default(name))?)
    }

    pub fn get_bean_info(&self, name: &ObjectName) -> ServerResult<BeanInfo> {
        let name = self.non_default(name);
        let entry = self.lookup(&name)?;
        let info = self.introspector.bean_info(&*entry.bean);
        self.check(Some(&info.class_name), None, Some(&name), Action::GetMBeanInfo)?;
        Ok(info)
    }

    pub fn is_instance_of(&self, name: &ObjectName, class_name: &str) -> ServerResult<bool> {
        let name = self.non_default(name);
        let entry = self.lookup(&name)?;
        self.check(Some(&entry.class_name), None, Some(&name), Action::IsInstanceOf)?;
        Ok(entry.interfaces.iter().any(|i| i == class_name)
            || self.introspector.is_instance_of(&*entry.bean, class_name))
    }

    /// The loader that found the class of the bean, if the server created
    /// it.
    pub fn get_class_loader_for(
        &self,
        name: &ObjectName,
    ) -> ServerResult<Option<Arc<dyn ClassLoader>>> {
        let name = self.non_default(name);
        let entry = self.lookup(&name)?;
        self.check(Some(&entry.class_name), None, Some(&name), Action::GetClassLoaderFor)?;
        Ok(entry.loader)
    }

    /// The class-loader bean registered under `loader`, or the server's own
    /// loader when `loader` is `None`.
    pub fn get_class_loader(&self, loader: Option<&ObjectName>) -> ServerResult<Arc<dyn ClassLoader>> {
        match loader {
            None => {
                self.check(None, None, None, Action::GetClassLoader)?;
                Ok(self.instantiator.server_loader())
            }
            Some(loader) => {
                let name = self.non_default(loader);
                let entry = self.lookup(&name)?;
                self.check(Some(&entry.class_name), None, Some(&name), Action::GetClassLoader)?;
                entry
                    .bean
                    .as_class_loader()
                    .ok_or(ServerError::NotFound(name))
            }
        }
    }

    /// Domains holding at least one bean. With an access controller,
    /// domains the caller may not see are left out.
    pub fn get_domains(&self) -> ServerResult<Vec<String>> {
        let domains = self.repository.domains()?;
        if self.access.is_none() {
            return Ok(domains);
        }
        self.check(None, None, None, Action::GetDomains)?;
        Ok(domains
            .into_iter()
            .filter(|domain| {
                ObjectName::new(domain.as_str(), [("x", "x")])
                    .map(|probe| {
                        self.check(None, None, Some(&probe), Action::GetDomains)
                            .is_ok()
                    })
                    .unwrap_or(false)
            })
            .collect())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Registered beans whose names match `pattern` (everything when `None`)
    /// and which satisfy `query`. A query that fails on a bean counts as not
    /// satisfied.
    pub fn query_beans(
        &self,
        pattern: Option<&ObjectName>,
        query: Option<&QueryExp>,
    ) -> ServerResult<BTreeSet<ObjectInstance>> {
        self.query(pattern, query, Action::QueryMBeans)
    }

    /// As [`query_beans`](Self::query_beans), returning names only.
    pub fn query_names(
        &self,
        pattern: Option<&ObjectName>,
        query: Option<&QueryExp>,
    ) -> ServerResult<BTreeSet<ObjectName>> {
        Ok(self
            .query(pattern, query, Action::QueryNames)?
            .into_iter()
            .map(|instance| instance.name)
            .collect())
    }

    fn query(
        &self,
        pattern: Option<&ObjectName>,
        query: Option<&QueryExp>,
        action: Action,
    ) -> ServerResult<BTreeSet<ObjectInstance>> {
        if self.access.is_some() {
            self.check(None, None, None, action)?;
        }
        let pattern = pattern.map(|p| self.non_default(p));
        let candidates = self.repository.query(pattern.as_ref())?;

        Ok(candidates
            .into_iter()
            .filter(|entry| {
                self.access.is_none()
                    || self
                        .check(
                            Some(&entry.object.class_name),
                            None,
                            Some(&entry.name),
                            action,
                        )
                        .is_ok()
            })
            .filter(|entry| match query {
                None => true,
                Some(query) => query.apply(&entry.name, self).unwrap_or_else(|e| {
                    trace!(name = %entry.name, error = %e, "query failed on candidate");
                    false
                }),
            })
            .map(|entry| ObjectInstance::new(entry.name, entry.object.class_name))
            .collect())
    }

    // -----------------------------------------------------------------------
    // Notification listeners
    // -----------------------------------------------------------------------

    /// Add `listener` to the broadcaster bean `name`. The listener sees the
    /// bean's registered name as the source of notifications the bean
    /// emits about itself.
    pub fn add_notification_listener(
        &self,
        name: &ObjectName,
        listener: Arc<dyn NotificationListener>,
        filter: Option<Arc<dyn NotificationFilter>>,
        handback: Option<Handback>,
    ) -> ServerResult<()> {
        let name = self.non_default(name);
        let entry = self.lookup(&name)?;
        self.check(
            Some(&entry.class_name),
            None,
            Some(&name),
            Action::AddNotificationListener,
        )?;
        let broadcaster = entry.bean.broadcaster().ok_or_else(|| {
            ServerError::IllegalArgument(format!("{name} is not a notification broadcaster"))
        })?;

        let wrapper = self
            .wrappers
            .get_or_create(&listener, &name, ObjectRef::of_arc(&entry.bean));
        broadcaster.add_notification_listener(wrapper.as_listener(), filter, handback);
        debug!(name = %name, "listener added");
        Ok(())
    }

    /// Add the registered bean `listener` as a listener on `name`.
    pub fn add_notification_listener_bean(
        &self,
        name: &ObjectName,
        listener: &ObjectName,
        filter: Option<Arc<dyn NotificationFilter>>,
        handback: Option<Handback>,
    ) -> ServerResult<()> {
        let listener_entry = self.lookup(listener)?;
        let listener_bean = listener_entry.bean.as_listener().ok_or_else(|| {
            ServerError::IllegalArgument(format!("{listener} is not a notification listener"))
        })?;
        self.add_notification_listener(name, listener_bean, filter, handback)
    }

    /// Remove every registration of `listener` on `name`.
    pub fn remove_notification_listener(
        &self,
        name: &ObjectName,
        listener: &Arc<dyn NotificationListener>,
    ) -> ServerResult<()> {
        self.remove_listener(name, listener, None)
    }

    /// Remove the registration of `listener` on `name` with exactly this
    /// filter and handback.
    pub fn remove_notification_listener_with(
        &self,
        name: &ObjectName,
        listener: &Arc<dyn NotificationListener>,
        filter: Option<&Arc<dyn NotificationFilter>>,
        handback: Option<&Handback>,
    ) -> ServerResult<()> {
        self.remove_listener(name, listener, Some((filter, handback)))
    }

    pub fn remove_notification_listener_bean(
        &self,
        name: &ObjectName,
        listener: &ObjectName,
    ) -> ServerResult<()> {
        let listener = self.listener_bean(listener)?;
        self.remove_listener(name, &listener, None)
    }

    pub fn remove_notification_listener_bean_with(
        &self,
        name: &ObjectName,
        listener: &ObjectName,
        filter: Option<&Arc<dyn NotificationFilter>>,
        handback: Option<&Handback>,
    ) -> ServerResult<()> {
        let listener = self.listener_bean(listener)?;
        self.remove_listener(name, &listener, Some((filter, handback)))
    }

    fn remove_listener(
        &self,
        name: &ObjectName,
        listener: &Arc<dyn NotificationListener>,
        exact: Option<(Option<&Arc<dyn NotificationFilter>>, Option<&Handback>)>,
    ) -> ServerResult<()> {
        let name = self.non_default(name);
        let entry = self.lookup(&name)?;
        self.check(
            Some(&entry.class_name),
            None,
            Some(&name),
            Action::RemoveNotificationListener,
        )?;
        let broadcaster = entry.bean.broadcaster().ok_or_else(|| {
            ServerError::IllegalArgument(format!("{name} is not a notification broadcaster"))
        })?;

        let wrapper = self
            .wrappers
            .find(listener, &name, ObjectRef::of_arc(&entry.bean))
            .ok_or_else(|| ServerError::ListenerNotFound("unknown listener".into()))?;
        let as_listener = wrapper.as_listener();
        let removed = match exact {
            None => broadcaster.remove_notification_listener(&as_listener),
            Some((filter, handback)) => {
                broadcaster.remove_notification_listener_with(&as_listener, filter, handback)
            }
        };
        drop(as_listener);
        self.wrappers.release(wrapper);
        removed?;
        debug!(name = %name, "listener removed");
        Ok(())
    }

    fn listener_bean(&self, name: &ObjectName) -> ServerResult<Arc<dyn NotificationListener>> {
        let entry = self.lookup(name).map_err(|e| match e {
            ServerError::NotFound(name) => ServerError::ListenerNotFound(name.to_string()),
            other => other,
        })?;
        entry.bean.as_listener().ok_or_else(|| {
            ServerError::IllegalArgument(format!("{name} is not a notification listener"))
        })
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn non_default(&self, name: &ObjectName) -> ObjectName {
        name.with_default_domain(&self.default_domain)
    }

    fn requested_name(&self, name: Option<&ObjectName>) -> ServerResult<Option<ObjectName>> {
        match name {
            Some(name) if name.is_pattern() => {
                Err(ServerError::InvalidName(format!("{name} is a pattern")))
            }
            Some(name) => Ok(Some(self.non_default(name))),
            None => Ok(None),
        }
    }

    fn lookup(&self, name: &ObjectName) -> ServerResult<RegisteredBean> {
        let name = self.non_default(name);
        match self.repository.lookup(&name)? {
            Some(entry) => Ok(entry),
            None => Err(ServerError::NotFound(name)),
        }
    }

    fn loader_bean(&self, name: &ObjectName) -> ServerResult<Arc<dyn ClassLoader>> {
        let name = self.non_default(name);
        let entry = self.lookup(&name)?;
        entry.bean.as_class_loader().ok_or(ServerError::NotFound(name))
    }

    fn check(
        &self,
        class_name: Option<&str>,
        member: Option<&str>,
        name: Option<&ObjectName>,
        action: Action,
    ) -> ServerResult<()> {
        let Some(access) = &self.access else {
            return Ok(());
        };
        let permission = Permission {
            class_name: class_name.map(str::to_string),
            member: member.map(str::to_string),
            object_name: name.cloned(),
            action,
        };
        access.check(&permission)?;
        Ok(())
    }

    fn check_trust(&self, class_name: &str) -> ServerResult<()> {
        if let Some(access) = &self.access {
            access.check_trust(class_name)?;
        }
        Ok(())
    }

    /// The members of `requested` the caller may use, after a coarse check
    /// on the bean that fails the whole request.
    fn permitted_members(
        &self,
        entry: &RegisteredBean,
        name: &ObjectName,
        requested: &[String],
        action: Action,
    ) -> ServerResult<Vec<String>> {
        if self.access.is_none() {
            return Ok(requested.to_vec());
        }
        self.check(Some(&entry.class_name), None, Some(name), action)?;
        Ok(requested
            .iter()
            .filter(|member| {
                self.check(Some(&entry.class_name), Some(member.as_str()), Some(name), action)
                    .is_ok()
            })
            .cloned()
            .collect())
    }
}

impl QueryContext for Interceptor {
    fn attribute(&self, name: &ObjectName, attribute: &str) -> Result<Value, QueryError> {
        self.get_attribute(name, attribute)
            .map_err(|e| QueryError::Attribute {
                name: name.clone(),
                attribute: attribute.to_string(),
                reason: e.to_string(),
            })
    }

    fn class_name(&self, name: &ObjectName) -> Result<String, QueryError> {
        self.lookup(name)
            .map(|entry| entry.class_name)
            .map_err(|e| QueryError::Bean(e.to_string()))
    }

    fn is_instance_of(&self, name: &ObjectName, class_name: &str) -> Result<bool, QueryError> {
        Interceptor::is_instance_of(self, name, class_name)
            .map_err(|e| QueryError::Bean(e.to_string()))
    }
}

impl fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("server_id", &self.delegate.server_id())
            .field("default_domain", &self.default_domain)
            .field("beans", &self.repository.count())
            .field("secured", &self.access.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bean::BeanRegistration;
    use crate::error::BeanError;
    use crate::table::{AccessorTable, TableBean};
    use mbs_types::Impact;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn name(s: &str) -> ObjectName {
        ObjectName::parse(s).unwrap()
    }

    fn server() -> Interceptor {
        Interceptor::new(ServerConfig::default()).unwrap()
    }

    fn plain_bean() -> Arc<dyn ManagedBean> {
        let table = AccessorTable::new("test.Plain", "")
            .read_only("Answer", "u64", "", |_: &()| Ok(Value::from(42)))
            .operation("ping", "", &[], "string", Impact::Info, |_: &(), _| {
                Ok(Value::from("pong"))
            });
        Arc::new(TableBean::new((), Arc::new(table)))
    }

    /// A bean whose pre-register hook renames it to `renamed:type=Hooked`.
    struct Renaming {
        post_ok: AtomicBool,
    }

    impl ManagedBean for Renaming {
        fn bean_info(&self) -> BeanInfo {
            BeanInfo::new("test.Renaming", "")
        }
        fn get_attribute(&self, name: &str) -> Result<Value, BeanError> {
            Err(BeanError::AttributeNotFound(name.into()))
        }
        fn set_attribute(&self, attribute: Attribute) -> Result<(), BeanError> {
            Err(BeanError::AttributeNotFound(attribute.name))
        }
        fn invoke(&self, op: &str, _: &[Value], _: &[String]) -> Result<Value, BeanError> {
            Err(BeanError::OperationNotFound(op.into()))
        }
        fn registration(&self) -> Option<&dyn BeanRegistration> {
            Some(self)
        }
    }

    impl BeanRegistration for Renaming {
        fn pre_register(&self, _: Option<&ObjectName>) -> Result<Option<ObjectName>, BeanError> {
            Ok(Some(ObjectName::parse("renamed:type=Hooked").unwrap()))
        }
        fn post_register(&self, registered: bool) {
            self.post_ok.store(registered, Ordering::SeqCst);
        }
    }

    #[test]
    fn delegate_registered_at_startup() {
        let s = server();
        assert_eq!(s.get_bean_count(), 1);
        assert!(s.is_registered(&delegate_name()).unwrap());
        assert_eq!(s.get_domains().unwrap(), vec!["JMImplementation"]);
        assert_eq!(
            s.get_attribute(&delegate_name(), "ServerId").unwrap(),
            Value::from(s.delegate().server_id())
        );
    }

    #[test]
    fn delegate_cannot_be_unregistered() {
        let s = server();
        assert!(matches!(
            s.unregister_bean(&delegate_name()),
            Err(ServerError::IllegalArgument(_))
        ));
        assert!(s.is_registered(&delegate_name()).unwrap());
    }

    #[test]
    fn reserved_domain_rejected() {
        let s = server();
        assert!(matches!(
            s.register_bean(plain_bean(), Some(&name("JMImplementation:type=Mine"))),
            Err(ServerError::IllegalArgument(_))
        ));
    }

    #[test]
    fn empty_domain_resolves_to_default() {
        let s = server();
        let instance = s.register_bean(plain_bean(), Some(&name(":type=Local"))).unwrap();
        assert_eq!(instance.name, name("DefaultDomain:type=Local"));
        assert_eq!(
            s.get_attribute(&name(":type=Local"), "Answer").unwrap(),
            Value::from(42)
        );
    }

    #[test]
    fn pattern_names_rejected() {
        let s = server();
        assert!(matches!(
            s.register_bean(plain_bean(), Some(&name("app:*"))),
            Err(ServerError::InvalidName(_))
        ));
        assert!(matches!(
            s.unregister_bean(&name("app:type=X,*")),
            Err(ServerError::InvalidName(_))
        ));
    }

    #[test]
    fn pre_register_can_rename() {
        let s = server();
        let bean = Arc::new(Renaming {
            post_ok: AtomicBool::new(false),
        });
        let instance = s
            .register_bean(bean.clone(), Some(&name("asked:type=Hooked")))
            .unwrap();
        assert_eq!(instance.name, name("renamed:type=Hooked"));
        assert!(bean.post_ok.load(Ordering::SeqCst));
        assert!(!s.is_registered(&name("asked:type=Hooked")).unwrap());
    }

    #[test]
    fn missing_name_is_illegal_argument() {
        let s = server();
        assert!(matches!(
            s.register_bean(plain_bean(), None),
            Err(ServerError::IllegalArgument(_))
        ));
        assert_eq!(s.get_bean_count(), 1);
    }

    #[test]
    fn dispatch_round_trip() {
        let s = server();
        let n = name("app:type=Plain");
        s.register_bean(plain_bean(), Some(&n)).unwrap();
        assert_eq!(s.invoke(&n, "ping", &[], &[]).unwrap(), Value::from("pong"));
        assert_eq!(
            s.get_attributes(&n, &["Answer".into(), "Missing".into()]).unwrap(),
            vec![Attribute::new("Answer", 42)]
        );
        assert!(matches!(
            s.set_attribute(&n, Attribute::new("Answer", 1)),
            Err(ServerError::Bean(BeanError::ReadOnly(_)))
        ));
        assert_eq!(s.get_object_instance(&n).unwrap().class_name(), Some("test.Plain"));
        assert_eq!(s.get_bean_info(&n).unwrap().operations.len(), 1);
        assert!(s.is_instance_of(&n, "test.Plain").unwrap());
        assert!(s.get_class_loader_for(&n).unwrap().is_none());
    }

    #[test]
    fn not_a_broadcaster() {
        let s = server();
        let n = name("app:type=Plain");
        s.register_bean(plain_bean(), Some(&n)).unwrap();
        let listener: Arc<dyn NotificationListener> =
            Arc::new(|_: mbs_types::Notification, _: Option<&Handback>| {});
        assert!(matches!(
            s.add_notification_listener(&n, listener, None, None),
            Err(ServerError::IllegalArgument(_))
        ));
    }
}
