use padlock_core::{Authorizable, MemoryRoleStore, RoleRegistry, RoleStore, SubjectRef};

struct Project {
    id: i64,
}

impl Authorizable for Project {
    const RESOURCE_TYPE: &'static str = "Project";

    fn resource_id(&self) -> String {
        self.id.to_string()
    }
}

fn setup() -> (MemoryRoleStore, RoleRegistry) {
    let store = MemoryRoleStore::new();
    let registry = RoleRegistry::new(store.clone());
    (store, registry)
}

#[tokio::test]
async fn test_resource_side_mirrors_subject_side() {
    let (store, registry) = setup();
    let alice = SubjectRef::new("alice");
    let project = Project { id: 1 };

    registry
        .grant_role_to(&project, "owner", &alice)
        .await
        .unwrap();
    assert!(registry.accepts_role(&project, "owner", &alice).await.unwrap());
    assert!(registry.has_role(&alice, "owner", &project).await.unwrap());
    assert_eq!(
        registry.roles_accepted_from(&project, &alice).await.unwrap(),
        vec!["owner".to_string()]
    );

    registry
        .revoke_role_from(&project, "owner", &alice)
        .await
        .unwrap();
    assert!(!registry.accepts_role(&project, "owner", &alice).await.unwrap());
    assert_eq!(store.role_count(), 0);
}

#[tokio::test]
async fn test_subjects_accepted_with_role() {
    let (_, registry) = setup();
    let alice = SubjectRef::new("alice");
    let bob = SubjectRef::new("bob");
    let carol = SubjectRef::new("carol");
    let project = Project { id: 1 };
    let other = Project { id: 2 };

    registry.grant_role_to(&project, "owner", &alice).await.unwrap();
    registry.grant_role_to(&project, "editor", &bob).await.unwrap();
    registry.grant_role_to(&project, "viewer", &carol).await.unwrap();
    registry.grant_role_to(&other, "owner", &carol).await.unwrap();

    let owners = registry
        .subjects_accepted_with_role(&project, "owner")
        .await
        .unwrap();
    assert_eq!(owners, vec![alice.clone()]);

    let mut writers = registry
        .subjects_accepted_with_role(&project, ["owner", "editor"])
        .await
        .unwrap();
    writers.sort();
    assert_eq!(writers, vec![alice.clone(), bob.clone()]);

    assert!(registry
        .subjects_accepted_with_role(&project, "admin")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_subjects_accepted_are_distinct() {
    let (_, registry) = setup();
    let alice = SubjectRef::new("alice");
    let bob = SubjectRef::new("bob");
    let project = Project { id: 1 };

    registry.grant_role_to(&project, "owner", &alice).await.unwrap();
    registry.grant_role_to(&project, "editor", &alice).await.unwrap();
    registry.grant_role_to(&project, "viewer", &bob).await.unwrap();

    let mut subjects = registry.subjects_accepted(&project).await.unwrap();
    subjects.sort();
    assert_eq!(subjects, vec![alice, bob]);
}

#[tokio::test]
async fn test_destroy_resource_cascades_to_roles() {
    let (store, registry) = setup();
    let alice = SubjectRef::new("alice");
    let project = Project { id: 1 };
    let other = Project { id: 2 };

    registry.grant_role_to(&project, "owner", &alice).await.unwrap();
    registry.grant_role_to(&project, "editor", &alice).await.unwrap();
    registry.grant_role_to(&other, "owner", &alice).await.unwrap();

    assert_eq!(registry.destroy_resource(&project).await.unwrap(), 2);

    assert!(store
        .roles_for_resource(&project.resource_ref())
        .await
        .unwrap()
        .is_empty());
    assert!(!registry
        .has_role(&alice, ["owner", "editor"], &project)
        .await
        .unwrap());
    assert!(registry.has_role(&alice, "owner", &other).await.unwrap());
    assert_eq!(registry.destroy_resource(&project).await.unwrap(), 0);
}

#[tokio::test]
async fn test_accepted_roles_lists_roles_on_resource_only() {
    let (_, registry) = setup();
    let alice = SubjectRef::new("alice");
    let bob = SubjectRef::new("bob");
    let project = Project { id: 1 };

    registry.grant_role_to(&project, "owner", &alice).await.unwrap();
    registry.grant_role_to(&project, "owner", &bob).await.unwrap();
    registry.grant_role_to(&project, "viewer", &bob).await.unwrap();
    registry
        .grant_role_to(&Project { id: 2 }, "editor", &alice)
        .await
        .unwrap();

    let mut names: Vec<String> = registry
        .accepted_roles(&project)
        .await
        .unwrap()
        .into_iter()
        .map(|role| role.name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["owner".to_string(), "viewer".to_string()]);

    registry.revoke_role_from(&project, "viewer", &bob).await.unwrap();
    assert_eq!(registry.accepted_roles(&project).await.unwrap().len(), 1);
    assert!(registry
        .accepted_roles(&Project { id: 3 })
        .await
        .unwrap()
        .is_empty());
}
