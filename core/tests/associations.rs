//! Bidirectional consistency of `todo.tags` and `tag.todos` across operation
//! sequences, checked against the in-memory store.

use serde_json::{json, Value};
use todos_core::store::{document_id, id_list};
use todos_core::{Document, Error, Filter, Links, ObjectId, Service, Store, Update};

fn payload(value: Value) -> Document {
    value.as_object().cloned().unwrap()
}

fn links() -> Links {
    Links::for_host("localhost:8080")
}

/// Asserts `G ∈ T.tags` iff `T ∈ G.todos` for every stored pair.
async fn assert_symmetric(store: &Store) {
    let todos = store.todos.find(&Filter::All).await.unwrap();
    let tags = store.tags.find(&Filter::All).await.unwrap();
    for todo in &todos {
        let todo_id = document_id(todo).unwrap();
        for tag in &tags {
            let tag_id = document_id(tag).unwrap();
            let forward = id_list(todo, "tags").contains(&tag_id);
            let backward = id_list(tag, "todos").contains(&todo_id);
            assert_eq!(
                forward, backward,
                "todo {todo_id} / tag {tag_id}: todo side {forward}, tag side {backward}"
            );
        }
    }
}

async fn new_tag(service: &Service, title: &str) -> String {
    let tag = service
        .tags
        .create(payload(json!({ "title": title })), &links())
        .await
        .unwrap();
    tag["id"].as_str().unwrap().to_string()
}

async fn new_todo(service: &Service, title: &str, tags: &[&str]) -> Value {
    service
        .todos
        .create(payload(json!({ "title": title, "tags": tags })), &links())
        .await
        .unwrap()
}

fn ids_of(values: &[Value]) -> Vec<&str> {
    values.iter().map(|v| v["id"].as_str().unwrap()).collect()
}

#[tokio::test]
async fn create_with_tags_expands_summaries_and_links_back() {
    let store = Store::in_memory();
    let service = Service::new(store.clone());
    let g1 = new_tag(&service, "urgent").await;
    let g2 = new_tag(&service, "home").await;

    let todo = new_todo(&service, "buy milk", &[&g1, &g2]).await;
    let id = todo["id"].as_str().unwrap();
    assert_eq!(
        todo["tags"],
        json!([{ "id": g1, "title": "urgent" }, { "id": g2, "title": "home" }])
    );

    let fetched = service.todos.get(id).await.unwrap();
    assert_eq!(fetched["tags"], todo["tags"]);

    let tagged = service.tags.todos(&g1, &links()).await.unwrap();
    assert_eq!(ids_of(&tagged), vec![id]);
    assert_eq!(
        tagged[0]["url"],
        format!("http://localhost:8080/todos/{id}")
    );
    assert_symmetric(&store).await;
}

#[tokio::test]
async fn create_drops_unknown_tags() {
    let store = Store::in_memory();
    let service = Service::new(store.clone());
    let real = new_tag(&service, "real").await;
    let ghost = ObjectId::new().to_hex();

    let todo = new_todo(&service, "x", &[&ghost, &real]).await;
    assert_eq!(todo["tags"], json!([{ "id": real, "title": "real" }]));
    assert_symmetric(&store).await;
}

#[tokio::test]
async fn attaching_twice_matches_attaching_once() {
    let store = Store::in_memory();
    let service = Service::new(store.clone());
    let tag = new_tag(&service, "urgent").await;
    let todo = new_todo(&service, "x", &[]).await;
    let todo_id = todo["id"].as_str().unwrap();
    let body = payload(json!({ "id": tag }));

    let first = service.todos.assign_tag(todo_id, &body).await.unwrap();
    let second = service.todos.assign_tag(todo_id, &body).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(second["todos"], json!([todo_id]));

    let tags = service.todos.tags(todo_id).await.unwrap();
    assert_eq!(ids_of(&tags), vec![tag.as_str()]);
    assert_symmetric(&store).await;
}

#[tokio::test]
async fn detach_removes_both_sides() {
    let store = Store::in_memory();
    let service = Service::new(store.clone());
    let tag = new_tag(&service, "urgent").await;
    let todo = new_todo(&service, "x", &[&tag]).await;
    let todo_id = todo["id"].as_str().unwrap();

    service.todos.detach_tag(todo_id, &tag).await.unwrap();
    assert!(service.todos.tags(todo_id).await.unwrap().is_empty());
    assert!(service.tags.todos(&tag, &links()).await.unwrap().is_empty());

    // A second detach of the same pairing is a no-op.
    service.todos.detach_tag(todo_id, &tag).await.unwrap();
    assert_symmetric(&store).await;
}

#[tokio::test]
async fn clear_tags_empties_todo_and_reverse_refs() {
    let store = Store::in_memory();
    let service = Service::new(store.clone());
    let g1 = new_tag(&service, "a").await;
    let g2 = new_tag(&service, "b").await;
    let todo = new_todo(&service, "x", &[&g1, &g2]).await;
    let other = new_todo(&service, "y", &[&g1]).await;
    let todo_id = todo["id"].as_str().unwrap();

    service.todos.clear_tags(todo_id).await.unwrap();

    assert!(service.todos.tags(todo_id).await.unwrap().is_empty());
    let g1_todos = service.tags.todos(&g1, &links()).await.unwrap();
    assert_eq!(ids_of(&g1_todos), vec![other["id"].as_str().unwrap()]);
    assert!(service.tags.todos(&g2, &links()).await.unwrap().is_empty());
    assert_symmetric(&store).await;
}

#[tokio::test]
async fn deleting_tag_cascades_to_todos() {
    let store = Store::in_memory();
    let service = Service::new(store.clone());
    let keep = new_tag(&service, "keep").await;
    let drop = new_tag(&service, "drop").await;
    let todo = new_todo(&service, "x", &[&keep, &drop]).await;
    let todo_id = todo["id"].as_str().unwrap();

    service.tags.delete(&drop).await.unwrap();

    let fetched = service.todos.get(todo_id).await.unwrap();
    assert_eq!(fetched["tags"], json!([{ "id": keep, "title": "keep" }]));
    assert!(matches!(
        service.tags.get(&drop).await,
        Err(Error::NotFound { .. })
    ));
    assert_symmetric(&store).await;
}

#[tokio::test]
async fn deleting_todo_cascades_to_tags() {
    let store = Store::in_memory();
    let service = Service::new(store.clone());
    let tag = new_tag(&service, "urgent").await;
    let gone = new_todo(&service, "gone", &[&tag]).await;
    let stays = new_todo(&service, "stays", &[&tag]).await;

    service
        .todos
        .delete(gone["id"].as_str().unwrap())
        .await
        .unwrap();

    let fetched = service.tags.get(&tag).await.unwrap();
    assert_eq!(fetched["todos"], json!([stays["id"]]));
    assert_symmetric(&store).await;
}

#[tokio::test]
async fn modify_todo_tags_maintains_reverse_refs() {
    let store = Store::in_memory();
    let service = Service::new(store.clone());
    let a = new_tag(&service, "a").await;
    let b = new_tag(&service, "b").await;
    let todo = new_todo(&service, "x", &[&a]).await;
    let todo_id = todo["id"].as_str().unwrap();

    let updated = service
        .todos
        .modify(todo_id, payload(json!({ "tags": [b] })), &links())
        .await
        .unwrap();

    // Modify expands tags to full documents, reverse refs included.
    assert_eq!(updated["tags"][0]["id"], b);
    assert_eq!(updated["tags"][0]["todos"], json!([todo_id]));
    assert!(service.tags.todos(&a, &links()).await.unwrap().is_empty());
    assert_symmetric(&store).await;
}

#[tokio::test]
async fn modify_tag_todos_maintains_reverse_refs() {
    let store = Store::in_memory();
    let service = Service::new(store.clone());
    let tag = new_tag(&service, "urgent").await;
    let t1 = new_todo(&service, "one", &[&tag]).await;
    let t2 = new_todo(&service, "two", &[]).await;
    let t1_id = t1["id"].as_str().unwrap();
    let t2_id = t2["id"].as_str().unwrap();

    service
        .tags
        .modify(&tag, payload(json!({ "todos": [t2_id] })), &links())
        .await
        .unwrap();

    assert!(service.todos.tags(t1_id).await.unwrap().is_empty());
    assert_eq!(ids_of(&service.todos.tags(t2_id).await.unwrap()), vec![tag.as_str()]);
    assert_symmetric(&store).await;
}

#[tokio::test]
async fn reset_todos_clears_tag_refs() {
    let store = Store::in_memory();
    let service = Service::new(store.clone());
    let tag = new_tag(&service, "urgent").await;
    new_todo(&service, "x", &[&tag]).await;

    service.todos.reset().await.unwrap();

    assert!(service.todos.list(&links()).await.unwrap().is_empty());
    assert_eq!(service.tags.get(&tag).await.unwrap()["todos"], json!([]));
}

#[tokio::test]
async fn reset_tags_clears_todo_refs() {
    let store = Store::in_memory();
    let service = Service::new(store.clone());
    let tag = new_tag(&service, "urgent").await;
    let todo = new_todo(&service, "x", &[&tag]).await;

    service.tags.reset().await.unwrap();

    let fetched = service.todos.get(todo["id"].as_str().unwrap()).await.unwrap();
    assert_eq!(fetched["tags"], json!([]));
    assert!(service.tags.list(&links()).await.unwrap().is_empty());
}

#[tokio::test]
async fn mixed_sequence_stays_symmetric() {
    let store = Store::in_memory();
    let service = Service::new(store.clone());
    let a = new_tag(&service, "a").await;
    let b = new_tag(&service, "b").await;
    let c = new_tag(&service, "c").await;
    let t1 = new_todo(&service, "1", &[&a, &b]).await;
    let t2 = new_todo(&service, "2", &[&b, &c]).await;
    let t1_id = t1["id"].as_str().unwrap();
    let t2_id = t2["id"].as_str().unwrap();

    service
        .todos
        .assign_tag(t1_id, &payload(json!({ "id": c })))
        .await
        .unwrap();
    assert_symmetric(&store).await;
    service.todos.detach_tag(t2_id, &b).await.unwrap();
    assert_symmetric(&store).await;
    service.tags.delete(&a).await.unwrap();
    assert_symmetric(&store).await;
    service.todos.clear_tags(t1_id).await.unwrap();
    assert_symmetric(&store).await;
    service.todos.delete(t2_id).await.unwrap();
    assert_symmetric(&store).await;

    let remaining = service.tags.list(&links()).await.unwrap();
    assert!(remaining.iter().all(|tag| tag["todos"] == json!([])));
}

#[tokio::test]
async fn reconcile_repairs_half_applied_updates() {
    let store = Store::in_memory();
    let service = Service::new(store.clone());
    let tag = new_tag(&service, "urgent").await;
    let todo = new_todo(&service, "x", &[]).await;
    let tag_id: ObjectId = tag.parse().unwrap();
    let todo_id: ObjectId = todo["id"].as_str().unwrap().parse().unwrap();
    let ghost = ObjectId::new();

    // Todo side written, tag side lost; plus a dangling ref on each side.
    store
        .todos
        .update_one(&Filter::Id(todo_id), &Update::add_to_set("tags", tag_id))
        .await
        .unwrap();
    store
        .todos
        .update_one(&Filter::Id(todo_id), &Update::add_to_set("tags", ghost))
        .await
        .unwrap();
    store
        .tags
        .update_one(&Filter::Id(tag_id), &Update::add_to_set("todos", ghost))
        .await
        .unwrap();

    let report = service.associations.reconcile().await.unwrap();
    assert_eq!(report.todos_repaired, 1);
    assert_eq!(report.tags_repaired, 1);
    assert_symmetric(&store).await;

    let fetched = service.tags.get(&tag).await.unwrap();
    assert_eq!(fetched["todos"], json!([todo_id.to_hex()]));

    let again = service.associations.reconcile().await.unwrap();
    assert!(again.is_clean());
}
