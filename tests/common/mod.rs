//! Common test utilities
//!
//! Trimmed copies of the origin's page layouts.

#![allow(dead_code)]

/// Front page with a link, an Ask HN post and a job ad
pub const LISTING: &str = r#"<html><body><center><table id="hnmain"><tr><td>
<table class="itemlist">
<tr class="athing" id="101">
  <td class="title"><span class="rank">1.</span></td>
  <td><center><a id="up_101" href="vote?id=101&amp;how=up"><div class="votearrow"></div></a></center></td>
  <td class="title"><a href="https://www.example.com/rust">Rust 2.0 released</a><span class="comhead"> (example.com) </span></td>
</tr>
<tr><td colspan="2"></td><td class="subtext">
  <span class="score" id="score_101">118 points</span> by <a href="user?id=alice">alice</a> 2 hours ago  | <a href="hide?id=101">hide</a> | <a href="item?id=101">42&nbsp;comments</a>
</td></tr>
<tr class="spacer" style="height:5px"></tr>
<tr class="athing" id="103">
  <td class="title"><span class="rank">2.</span></td>
  <td><center><a id="up_103" href="vote?id=103&amp;how=up"><div class="votearrow"></div></a></center></td>
  <td class="title"><a href="item?id=103">Ask HN: How do you test scrapers?</a></td>
</tr>
<tr><td colspan="2"></td><td class="subtext">
  <span class="score" id="score_103">31 points</span> by <a href="user?id=bob">bob</a> 4 hours ago  | <a href="hide?id=103">hide</a> | <a href="item?id=103">discuss</a>
</td></tr>
<tr class="spacer" style="height:5px"></tr>
<tr class="athing" id="102">
  <td class="title"><span class="rank">3.</span></td>
  <td></td>
  <td class="title"><a href="item?id=102">Acme (YC W20) is hiring engineers</a></td>
</tr>
<tr><td colspan="2"></td><td class="subtext">
  <span class="age"><a href="item?id=102">5 hours ago</a></span>
</td></tr>
<tr class="spacer" style="height:5px"></tr>
<tr><td colspan="2"></td><td class="title"><a href="news?p=2" class="morelink">More</a></td></tr>
</table>
</td></tr></table></center></body></html>"#;

/// Listing with a title row that lost its subtext partner
pub const LISTING_TRUNCATED: &str = r#"<html><body><table><tr><td><table>
<tr class="athing" id="1"><td class="title"><span class="rank">1.</span></td><td><a id="up_1" href="vote?id=1"></a></td><td class="title"><a href="https://a.example/">First</a></td></tr>
<tr><td colspan="2"></td><td class="subtext"><span id="score_1">3 points</span> by <a href="user?id=x">x</a> 1 hour ago | <a href="item?id=1">1 comment</a></td></tr>
<tr class="athing" id="2"><td class="title"><span class="rank">2.</span></td><td><a id="up_2" href="vote?id=2"></a></td><td class="title"><a href="https://b.example/">Second</a></td></tr>
</table></td></tr></table></body></html>"#;

/// Ask HN poll with story text and a five-comment thread
///
/// Thread levels are 0, 1, 2, 1, 0; the second level-1 comment is deleted.
pub const POLL_POST: &str = r#"<html><body><center><table id="hnmain"><tr><td>
<table class="fatitem">
<tr class="athing" id="300">
  <td class="title"><span class="rank"></span></td>
  <td><center><a id="up_300" href="vote?id=300&amp;how=up"><div class="votearrow"></div></a></center></td>
  <td class="title"><a href="item?id=300">Ask HN: Which editor do you use?</a></td>
</tr>
<tr><td colspan="2"></td><td class="subtext"><span class="score" id="score_300">57 points</span> by <a href="user?id=carol">carol</a> 3 hours ago  | <a href="item?id=300">5 comments</a></td></tr>
<tr style="height:2px"></tr>
<tr><td colspan="2"></td><td><div class="toptext">Pick one.</div></td></tr>
<tr><td colspan="2"></td><td><table>
  <tr class="athing"><td class="comment"><div>Vim</div></td></tr>
  <tr><td class="default"><span class="comhead"><span id="score_301">12 points</span></span></td></tr>
  <tr class="athing"><td class="comment"><div>Emacs</div></td></tr>
  <tr><td class="default"><span class="comhead"><span id="score_302">3 points</span></span></td></tr>
</table></td></tr>
<tr><td colspan="2"></td><td><form method="post" action="comment"><textarea name="text"></textarea></form></td></tr>
</table>
<br>
<table class="comment-tree">
<tr class="athing comtr" id="401"><td><table><tr>
  <td class="ind"><img src="s.gif" height="1" width="0"></td>
  <td class="default"><div><span class="comhead"><a href="user?id=dave" class="hnuser">dave</a> <span class="age"><a href="item?id=401">2 hours ago</a></span></span></div>
  <div class="comment"><span class="commtext c00">Root one<p>Second paragraph</p></span><div class="reply"><p><font size="1"><u><a href="reply?id=401">reply</a></u></font></p></div></div></td>
</tr></table></td></tr>
<tr class="athing comtr" id="402"><td><table><tr>
  <td class="ind"><img src="s.gif" height="1" width="40"></td>
  <td class="default"><div><span class="comhead"><a href="user?id=erin" class="hnuser">erin</a> <span class="age"><a href="item?id=402">1 hour ago</a></span></span></div>
  <div class="comment"><span class="commtext c00">Reply to root</span></div></td>
</tr></table></td></tr>
<tr class="athing comtr" id="403"><td><table><tr>
  <td class="ind"><img src="s.gif" height="1" width="80"></td>
  <td class="default"><div><span class="comhead"><a href="user?id=dave" class="hnuser">dave</a> <span class="age"><a href="item?id=403">50 minutes ago</a></span></span></div>
  <div class="comment"><span class="commtext c00">Nested <i>deeper</i></span></div></td>
</tr></table></td></tr>
<tr class="athing comtr" id="404"><td><table><tr>
  <td class="ind"><img src="s.gif" height="1" width="40"></td>
  <td class="default"><div><span class="comhead"></span></div>
  <div class="comment"><span class="commtext c00"></span></div></td>
</tr></table></td></tr>
<tr class="athing comtr" id="405"><td><table><tr>
  <td class="ind"><img src="s.gif" height="1" width="0"></td>
  <td class="default"><div><span class="comhead"><a href="user?id=fay" class="hnuser">fay</a> <span class="age"><a href="item?id=405">10 minutes ago</a></span></span></div>
  <div class="comment"><span class="commtext c00">Second root</span></div></td>
</tr></table></td></tr>
<tr><td class="title"><a href="/x?fnid=Zx9Tq1" rel="next">More</a></td></tr>
</table>
</td></tr></table></center></body></html>"#;

/// Permalink of a single comment
pub const COMMENT_PERMALINK: &str = r#"<html><body><center><table id="hnmain"><tr><td>
<table class="fatitem">
<tr class="athing" id="500"><td class="ind"></td>
  <td class="default"><div><span class="comhead"><a href="user?id=gus" class="hnuser">gus</a> 4 hours ago  | <a href="item?id=500">link</a> | <a href="item?id=499">parent</a></span></div>
  <div class="comment"><span class="commtext c00">Just a comment</span></div></td></tr>
<tr><td colspan="2"><form method="post" action="comment"><textarea name="text"></textarea></form></td></tr>
</table>
</td></tr></table></center></body></html>"#;

/// Continuation page reached through `/x?fnid=`
pub const MORE_COMMENTS: &str = r#"<html><body><center><table id="hnmain"><tr><td>
<table class="comment-tree">
<tr class="athing comtr"><td><table><tr>
  <td class="ind"><img src="s.gif" height="1" width="40"></td>
  <td class="default"><div><span class="comhead"><a href="user?id=hal" class="hnuser">hal</a> 1 hour ago  | <a href="item?id=601">link</a></span></div>
  <div class="comment"><span class="commtext c00">Continued</span></div></td>
</tr></table></td></tr>
<tr class="athing comtr"><td><table><tr>
  <td class="ind"><img src="s.gif" height="1" width="80"></td>
  <td class="default"><div><span class="comhead"><a href="user?id=ivy" class="hnuser">ivy</a> 30 minutes ago  | <a href="item?id=602">link</a></span></div>
  <div class="comment"><span class="commtext c00">Still going</span></div></td>
</tr></table></td></tr>
<tr><td class="title"><a href="/x?fnid=Next42" rel="next">More</a></td></tr>
</table>
</td></tr></table></center></body></html>"#;

/// Newest comments feed
pub const NEW_COMMENTS: &str = r#"<html><body><center><table id="hnmain">
<tr><td><span class="pagetop">Hacker News</span></td></tr>
<tr style="height:10px"></tr>
<tr><td><table class="comment-tree">
<tr class="athing"><td><table><tr>
  <td class="ind"><img src="s.gif" height="1" width="0"></td>
  <td class="default"><div><span class="comhead"><a href="user?id=jan" class="hnuser">jan</a> <span class="age"><a href="item?id=701">1 minute ago</a></span> | on: <a href="item?id=650">Some story</a></span></div>
  <div class="comment"><span class="commtext c00">Fresh take</span></div></td>
</tr></table></td></tr>
<tr class="athing"><td><table><tr>
  <td class="ind"><img src="s.gif" height="1" width="0"></td>
  <td class="default"><div><span class="comhead"><a href="user?id=kim" class="hnuser">kim</a> <span class="age"><a href="item?id=702">2 minutes ago</a></span> | on: <a href="item?id=651">Other story</a></span></div>
  <div class="comment"><span class="commtext c00">Another one</span></div></td>
</tr></table></td></tr>
</table></td></tr>
</table></center></body></html>"#;

/// Profile page
pub const USER: &str = r#"<html><body><center><table id="hnmain"><tr><td>
<table border="0">
<tr class="athing"><td valign="top">user:</td><td timestamp="1160418092"><a href="user?id=pg" class="hnuser">pg</a></td></tr>
<tr><td valign="top">created:</td><td><a href="front?day=2006-10-09&amp;birth=pg">October 9, 2006</a></td></tr>
<tr><td valign="top">karma:</td><td>157316</td></tr>
<tr><td valign="top">about:</td><td style="overflow:hidden;">Bug fixer.<p>Essays at paulgraham.com</p></td></tr>
</table>
</td></tr></table></center></body></html>"#;
