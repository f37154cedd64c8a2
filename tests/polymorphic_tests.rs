use graphsave::{
    Entity, EntityId, EntityRef, EntitySchema, GraphPersister, MemoryStore, RelationDescriptor,
    StoreError, Value,
};
use std::collections::BTreeMap;
use std::rc::Rc;

fn comment_schema() -> Rc<EntitySchema> {
    Rc::new(
        EntitySchema::new("comment", "comments").relation(RelationDescriptor::polymorphic_to(
            "commentable",
            "commentable_type",
            "commentable_id",
        )),
    )
}

fn post_schema() -> Rc<EntitySchema> {
    Rc::new(
        EntitySchema::new("post", "posts").relation(RelationDescriptor::polymorphic_many(
            "comments",
            "commentable_type",
            "commentable_id",
        )),
    )
}

fn video_schema() -> Rc<EntitySchema> {
    Rc::new(EntitySchema::new("video", "videos"))
}

fn entity_with(schema: &Rc<EntitySchema>, field: &str, value: &str) -> EntityRef {
    let mut entity = Entity::new(schema.clone());
    entity.set_field(field, value);
    entity.into_ref()
}

#[test]
fn morph_to_saves_target_first_and_wires_discriminator() {
    let article = entity_with(&post_schema(), "title", "hello");
    let comment = entity_with(&comment_schema(), "body", "nice");
    comment
        .borrow_mut()
        .set_one("commentable", article.clone())
        .unwrap();

    let mut persister = GraphPersister::new(MemoryStore::new());
    assert!(persister.persist(&comment).unwrap());

    let types: Vec<_> = persister
        .store()
        .save_log()
        .iter()
        .map(|(t, _)| t.as_str())
        .collect();
    assert_eq!(types, ["post", "comment"]);

    let store = persister.store();
    let row = store.row("comments", comment.borrow().id().unwrap()).unwrap();
    assert_eq!(
        row.get("commentable_type"),
        Some(&Value::Text("post".into()))
    );
    assert_eq!(
        row.get("commentable_id").and_then(Value::as_id),
        article.borrow().id()
    );

    // Re-load and resolve: the reference points back at the saved target.
    let resolved = store
        .resolve_polymorphic(row, "commentable_type", "commentable_id")
        .unwrap()
        .unwrap();
    let target = store.row("posts", article.borrow().id().unwrap()).unwrap();
    assert_eq!(resolved, target);
}

#[test]
fn morph_to_discriminator_follows_the_target_type() {
    let clip = entity_with(&video_schema(), "title", "demo");
    let comment = entity_with(&comment_schema(), "body", "nice");
    comment.borrow_mut().set_one("commentable", clip.clone()).unwrap();

    let mut persister = GraphPersister::new(MemoryStore::new());
    assert!(persister.persist(&comment).unwrap());

    let store = persister.store();
    let row = store.row("comments", comment.borrow().id().unwrap()).unwrap();
    assert_eq!(
        row.get("commentable_type"),
        Some(&Value::Text("video".into()))
    );
    let resolved = store
        .resolve_polymorphic(row, "commentable_type", "commentable_id")
        .unwrap()
        .unwrap();
    assert_eq!(resolved.get("title"), Some(&Value::Text("demo".into())));
}

#[test]
fn morph_many_children_carry_type_and_identifier() {
    let article = entity_with(&post_schema(), "title", "hello");
    let first = entity_with(&comment_schema(), "body", "one");
    let second = entity_with(&comment_schema(), "body", "two");
    article
        .borrow_mut()
        .set_many("comments", vec![first.clone(), second.clone()])
        .unwrap();

    let mut persister = GraphPersister::new(MemoryStore::new());
    assert!(persister.persist(&article).unwrap());

    let store = persister.store();
    for comment in [&first, &second] {
        let row = store.row("comments", comment.borrow().id().unwrap()).unwrap();
        assert_eq!(
            row.get("commentable_type"),
            Some(&Value::Text("post".into()))
        );
        assert_eq!(
            row.get("commentable_id").and_then(Value::as_id),
            article.borrow().id()
        );
    }
    assert_eq!(store.saves_of("comment"), 2);
}

#[test]
fn morph_one_child_is_saved_after_its_owner() {
    let user_schema = Rc::new(
        EntitySchema::new("user", "users").relation(RelationDescriptor::polymorphic_one(
            "avatar",
            "imageable_type",
            "imageable_id",
        )),
    );
    let image_schema = Rc::new(EntitySchema::new("image", "images"));

    let user = entity_with(&user_schema, "name", "ada");
    let avatar = entity_with(&image_schema, "url", "a.png");
    user.borrow_mut().set_one("avatar", avatar.clone()).unwrap();

    let mut persister = GraphPersister::new(MemoryStore::new());
    assert!(persister.persist(&user).unwrap());

    let types: Vec<_> = persister
        .store()
        .save_log()
        .iter()
        .map(|(t, _)| t.as_str())
        .collect();
    assert_eq!(types, ["user", "image"]);

    let row = persister
        .store()
        .row("images", avatar.borrow().id().unwrap())
        .unwrap();
    assert_eq!(row.get("imageable_type"), Some(&Value::Text("user".into())));
    assert_eq!(
        row.get("imageable_id").and_then(Value::as_id),
        user.borrow().id()
    );
}

#[test]
fn resolving_an_unregistered_type_is_an_error() {
    let article = entity_with(&post_schema(), "title", "hello");
    let mut persister = GraphPersister::new(MemoryStore::new());
    assert!(persister.persist(&article).unwrap());

    let mut row: BTreeMap<String, Value> = BTreeMap::new();
    row.insert("ref_type".to_string(), Value::Text("ghost".into()));
    row.insert(
        "ref_id".to_string(),
        Value::Id(article.borrow().id().unwrap()),
    );

    let err = persister
        .store()
        .resolve_polymorphic(&row, "ref_type", "ref_id")
        .unwrap_err();
    assert!(matches!(err, StoreError::UnknownEntityType(t) if t == "ghost"));
}

#[test]
fn unset_polymorphic_reference_resolves_to_none() {
    let article = entity_with(&post_schema(), "title", "hello");
    let mut persister = GraphPersister::new(MemoryStore::new());
    assert!(persister.persist(&article).unwrap());

    let row = persister
        .store()
        .row("posts", article.borrow().id().unwrap())
        .unwrap();
    let resolved = persister
        .store()
        .resolve_polymorphic(row, "commentable_type", "commentable_id")
        .unwrap();
    assert!(resolved.is_none());
}

#[test]
fn assigned_identifiers_are_unique() {
    let a = entity_with(&video_schema(), "title", "a");
    let b = entity_with(&video_schema(), "title", "b");
    let mut persister = GraphPersister::new(MemoryStore::new());
    assert!(persister.persist(&a).unwrap());
    assert!(persister.persist(&b).unwrap());

    let ids: Vec<EntityId> = [&a, &b].iter().map(|e| e.borrow().id().unwrap()).collect();
    assert_ne!(ids[0], ids[1]);
}
