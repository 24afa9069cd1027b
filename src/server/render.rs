//! Minimal HTML rendering for the server-rendered pages.
//!
//! Pages are assembled from a single shell plus small body builders; there is
//! no template engine. Everything user-supplied goes through `escape` before
//! it is interpolated.

use crate::identity::Principal;
use crate::posts::Post;

/// Feed intro blurb shown above the post list on the home page.
pub const HOME_INTRO: &str = "Lacus vel facilisis volutpat est velit egestas dui id ornare. Semper auctor neque vitae tempus quam. Sit amet cursus sit amet dictum sit amet justo. Viverra tellus in hac habitasse. Imperdiet proin fermentum leo vel orci porta. Donec ultrices tincidunt arcu non sodales neque sodales ut. Mattis molestie a iaculis at erat pellentesque adipiscing. Magnis dis parturient montes nascetur ridiculus mus mauris vitae ultricies. Adipiscing elit ut aliquam purus sit amet luctus venenatis lectus. Ultrices vitae auctor eu augue ut lectus arcu bibendum at. Odio euismod lacinia at quis risus sed vulputate odio ut. Cursus mattis molestie a iaculis at erat pellentesque adipiscing.";

pub const ABOUT_CONTENT: &str = "Hac habitasse platea dictumst vestibulum rhoncus est pellentesque. Dictumst vestibulum rhoncus est pellentesque elit ullamcorper. Non diam phasellus vestibulum lorem sed. Platea dictumst quisque sagittis purus sit. Egestas sed sed risus pretium quam vulputate dignissim suspendisse. Mauris in aliquam sem fringilla. Semper risus in hendrerit gravida rutrum quisque non tellus orci. Amet massa vitae tortor condimentum lacinia quis vel eros. Enim ut tellus elementum sagittis vitae. Mauris ultrices eros in cursus turpis massa tincidunt dui.";

pub const CONTACT_CONTENT: &str = "Scelerisque eleifend donec pretium vulputate sapien. Rhoncus urna neque viverra justo nec ultrices. Arcu dui vivamus arcu felis bibendum. Consectetur adipiscing elit duis tristique. Risus viverra adipiscing at in tellus integer feugiat. Sapien nec sagittis aliquam malesuada bibendum arcu vitae. Consequat interdum varius sit amet mattis. Iaculis nunc sed augue lacus. Interdum posuere lorem ipsum dolor sit amet consectetur adipiscing elit. Pulvinar elementum integer enim neque. Ultrices gravida dictum fusce ut placerat orci nulla. Mauris in aliquam sem fringilla ut morbi tincidunt. Tortor posuere ac ut consequat semper viverra nam libero.";

/// Escape text for interpolation into HTML element content or attributes.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn nav(signed_in: bool) -> String {
    let account = if signed_in {
        r#"<a href="/">Home</a> <a href="/compose">Compose</a> <a href="/my-posts">My posts</a> <a href="/signout">Sign out</a>"#
    } else {
        r#"<a href="/login">Log in</a> <a href="/signup">Sign up</a>"#
    };
    format!(
        r#"<nav><a href="/about">About</a> <a href="/contact">Contact</a> {}</nav>"#,
        account
    )
}

fn page(title: &str, signed_in: bool, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{} - quill</title></head><body>{}<main>{}</main></body></html>",
        escape(title),
        nav(signed_in),
        body
    )
}

fn post_card(post: &Post) -> String {
    format!(
        r#"<article><h2><a href="/posts/{id}">{title}</a></h2><p>{preview}</p><footer>{author} &middot; {date}</footer></article>"#,
        id = escape(&post.id),
        title = escape(&post.title),
        preview = escape(&post.content_short),
        author = escape(&post.author),
        date = escape(&post.date),
    )
}

pub fn home_page(posts: &[Post], who: &Principal) -> String {
    let mut body = format!("<h1>Home</h1><p>{}</p>", HOME_INTRO);
    for post in posts {
        body.push_str(&post_card(post));
    }
    if posts.is_empty() {
        body.push_str("<p>No posts yet.</p>");
    }
    body.push_str(&format!("<p>Signed in as {}</p>", escape(&who.name)));
    page("Home", true, &body)
}

pub fn my_posts_page(posts: &[Post], who: &Principal) -> String {
    let mut body = format!("<h1>Posts by {}</h1>", escape(&who.name));
    for post in posts {
        body.push_str(&post_card(post));
    }
    if posts.is_empty() {
        body.push_str("<p>You have not written anything yet.</p>");
    }
    page("My posts", true, &body)
}

pub fn post_page(post: &Post, can_delete: bool) -> String {
    let mut body = format!(
        "<h1>{title}</h1><p>{content}</p><footer>{author} &middot; {date}</footer>",
        title = escape(&post.title),
        content = escape(&post.content),
        author = escape(&post.author),
        date = escape(&post.date),
    );
    if can_delete {
        body.push_str(&format!(
            r#"<form method="post" action="/delete"><input type="hidden" name="id" value="{}"><button type="submit">Delete</button></form>"#,
            escape(&post.id)
        ));
    }
    page(&post.title, true, &body)
}

pub fn compose_page() -> String {
    let body = r#"<h1>Compose</h1><form method="post" action="/compose"><input name="title" placeholder="Title"><textarea name="content" placeholder="Write your post"></textarea><button type="submit">Publish</button></form>"#;
    page("Compose", true, body)
}

pub fn login_page() -> String {
    let body = r#"<h1>Log in</h1><form method="post" action="/login"><input name="username" placeholder="Username"><input name="password" type="password" placeholder="Password"><button type="submit">Log in</button></form>"#;
    page("Log in", false, body)
}

pub fn signup_page() -> String {
    let body = r#"<h1>Sign up</h1><form method="post" action="/signup"><input name="username" placeholder="Username"><input name="name" placeholder="Display name"><input name="password" type="password" placeholder="Password"><button type="submit">Sign up</button></form>"#;
    page("Sign up", false, body)
}

pub fn about_page(signed_in: bool) -> String {
    page("About", signed_in, &format!("<h1>About</h1><p>{}</p>", ABOUT_CONTENT))
}

pub fn contact_page(signed_in: bool) -> String {
    page("Contact", signed_in, &format!("<h1>Contact</h1><p>{}</p>", CONTACT_CONTENT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_post() -> Post {
        Post {
            id: "p-1".into(),
            title: "Hello <world>".into(),
            content: "Body & soul".into(),
            content_short: "Body & soul".into(),
            date: "2026-08-26 14:03".into(),
            created_at_ms: Utc::now().timestamp_millis(),
            owner_id: "u-1".into(),
            author: "Alice".into(),
        }
    }

    #[test]
    fn escapes_markup_in_user_content() {
        let html = post_page(&sample_post(), false);
        assert!(html.contains("Hello &lt;world&gt;"));
        assert!(html.contains("Body &amp; soul"));
        assert!(!html.contains("Hello <world>"));
    }

    #[test]
    fn delete_affordance_only_for_owner() {
        let post = sample_post();
        let owner_view = post_page(&post, true);
        let visitor_view = post_page(&post, false);
        assert!(owner_view.contains(r#"action="/delete""#));
        assert!(!visitor_view.contains(r#"action="/delete""#));
    }

    #[test]
    fn nav_switches_on_session_flag() {
        let signed_out = about_page(false);
        let signed_in = about_page(true);
        assert!(signed_out.contains(r#"href="/login""#));
        assert!(signed_in.contains(r#"href="/signout""#));
    }
}
